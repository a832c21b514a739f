mod track;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ridetrack_client::{RatingRequest, TrackingClient};
use ridetrack_core::{haversine_distance_m, Position, Rating, RideContext};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ridetrack")]
#[command(about = "Live pickup tracking for marketplace rides")]
struct Cli {
    #[command(flatten)]
    ride: RideArgs,

    #[command(subcommand)]
    command: Commands,
}

/// The fields a ride page embeds for its tracking widget.
#[derive(Debug, Args)]
struct RideArgs {
    /// Ride id
    #[arg(long, global = true)]
    ride_id: Option<String>,
    /// Viewer role: driver or passenger
    #[arg(long, global = true)]
    role: Option<String>,
    /// Viewer username (identifies the passenger on commuting rides)
    #[arg(long, global = true)]
    username: Option<String>,
    /// Occurrence date of a commuting ride (YYYY-MM-DD)
    #[arg(long, global = true)]
    ride_date: Option<String>,
    /// Ride status when the page was loaded (e.g. Booked, Ongoing, Done)
    #[arg(long, global = true)]
    ride_status: Option<String>,
    /// Initial device latitude
    #[arg(long, global = true, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,
    /// Initial device longitude
    #[arg(long, global = true, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,
}

impl RideArgs {
    fn context(&self) -> anyhow::Result<RideContext> {
        let ctx = RideContext::from_page_fields(|field| match field {
            "ride-id" => self.ride_id.clone(),
            "user-type" => self.role.clone(),
            "current-username" => self.username.clone(),
            "ride-date" => self.ride_date.clone(),
            "ride-status" => self.ride_status.clone(),
            _ => None,
        })?;
        Ok(ctx)
    }

    fn position(&self) -> Option<Position> {
        Some(Position::new(self.lat?, self.lon?))
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an interactive tracking session; commands are read from stdin
    Track,
    /// Submit a star rating for a finished ride
    Rate {
        /// Stars, 1 to 5
        rating: i64,
    },
    /// Print the great-circle distance between two points in meters
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Distance {
        lat1,
        lon1,
        lat2,
        lon2,
    } = cli.command
    {
        println!("{:.1}", haversine_distance_m(lat1, lon1, lat2, lon2));
        return Ok(());
    }

    let config = ridetrack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let ctx = cli.ride.context().context("invalid ride context")?;
    match cli.command {
        Commands::Track => track::run_track(&config, ctx, cli.ride.position()).await,
        Commands::Rate { rating } => run_rate(&config, &ctx, rating).await,
        Commands::Distance { .. } => Ok(()),
    }
}

async fn run_rate(
    config: &ridetrack_core::AppConfig,
    ctx: &RideContext,
    rating: i64,
) -> anyhow::Result<()> {
    let rating = Rating::new(rating)?;
    let client = TrackingClient::from_config(config)?;
    let receipt = client
        .submit_rating(&RatingRequest {
            ride_id: ctx.ride_id,
            ride_date: ctx.ride_date,
            rating,
        })
        .await?;

    println!(
        "{}",
        receipt
            .message
            .as_deref()
            .unwrap_or("Rating submitted.")
    );
    if let Some(url) = receipt.redirect_url {
        println!("redirect: {url}");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping tracking session");
}

#[cfg(test)]
mod tests;
