pub mod app_config;
pub mod config;
pub mod geo;
pub mod journey;
pub mod ride;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{
    haversine_distance_m, Position, EARTH_RADIUS_M, NEARBY_START_RADIUS_M, PICKUP_ADJUST_RADIUS_M,
};
pub use journey::{JourneyState, Rating, RatingError, RideStatus};
pub use ride::{ContextError, RideContext, Role};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
