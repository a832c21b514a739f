//! Periodic reads of the ride's live positions and status.

use std::sync::Arc;

use chrono::NaiveDate;
use ridetrack_core::{RideContext, RideStatus};

use crate::client::TrackingClient;
use crate::error::TrackingError;
use crate::types::{LiveLocations, RideRef};

/// Fetches the latest driver/passenger coordinates for one ride view.
#[derive(Debug, Clone)]
pub struct LiveLocationPoller {
    client: Arc<TrackingClient>,
    ride_id: i64,
    ride_date: Option<NaiveDate>,
}

impl LiveLocationPoller {
    #[must_use]
    pub fn new(ctx: &RideContext, client: Arc<TrackingClient>) -> Self {
        Self {
            client,
            ride_id: ctx.ride_id,
            ride_date: ctx.ride_date,
        }
    }

    /// # Errors
    ///
    /// Transport, status, or decode failures as [`TrackingError`].
    pub async fn poll_once(&self) -> Result<LiveLocations, TrackingError> {
        self.client.live_locations(self.ride_id, self.ride_date).await
    }

    /// One timer tick; a failed poll is logged and yields nothing.
    pub async fn tick(&self) -> Option<LiveLocations> {
        match self.poll_once().await {
            Ok(live) => Some(live),
            Err(e) => {
                tracing::warn!(error = %e, ride_id = self.ride_id, "live location poll failed");
                None
            }
        }
    }
}

/// Passenger-side poll of `/api/ride_status`.
#[derive(Debug, Clone)]
pub struct RideStatusPoller {
    client: Arc<TrackingClient>,
    ride: RideRef,
}

impl RideStatusPoller {
    #[must_use]
    pub fn new(ctx: &RideContext, client: Arc<TrackingClient>) -> Self {
        Self {
            client,
            ride: RideRef {
                ride_id: ctx.ride_id,
                ride_date: ctx.ride_date,
            },
        }
    }

    pub async fn tick(&self) -> Option<RideStatus> {
        match self.client.ride_status(&self.ride).await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, ride_id = self.ride.ride_id, "ride status poll failed");
                None
            }
        }
    }
}
