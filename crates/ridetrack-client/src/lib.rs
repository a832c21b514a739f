//! Live pickup tracking for an open ride view.
//!
//! The [`TrackingSession`] reports the local device position, polls the
//! other party's position, renders both on a [`MapView`], and drives the
//! journey from "not started" to "finished" through the [`JourneyTracker`].

pub mod client;
pub mod error;
pub mod geocode;
pub mod geolocation;
pub mod map;
pub mod pickup;
pub mod poller;
pub mod proximity;
pub mod reporter;
pub mod session;
pub mod types;
pub mod ui;

pub use client::TrackingClient;
pub use error::TrackingError;
pub use geocode::Geocoder;
pub use geolocation::{
    DeniedGeolocator, FixedGeolocator, GeolocationError, Geolocator, PositionFeed,
    SharedGeolocator,
};
pub use map::{Bounds, Cluster, MapRenderer, MapView, Marker, MarkerKind};
pub use pickup::{AdjustPhase, PickupAdjuster};
pub use poller::{LiveLocationPoller, RideStatusPoller};
pub use proximity::{DismissalRecord, JourneyTracker, PromptTarget};
pub use reporter::LocationReporter;
pub use session::{SessionTimings, TrackingSession};
pub use types::{
    LiveLocations, LocationReport, PassengerLocations, PickupUpdate, RatingReceipt, RatingRequest,
    RideRef,
};
pub use ui::{Effect, Outbound, UiCommand, UiEvent};
