//! Periodic upload of the local device position.

use std::sync::Arc;

use chrono::NaiveDate;
use ridetrack_core::{RideContext, Role};

use crate::client::TrackingClient;
use crate::error::TrackingError;
use crate::geolocation::Geolocator;
use crate::types::LocationReport;

/// Reads the device position and posts it to `/api/track_{role}_location`.
///
/// Cloning is cheap; each tick runs as its own task.
#[derive(Debug)]
pub struct LocationReporter<G> {
    client: Arc<TrackingClient>,
    geolocator: Arc<G>,
    role: Role,
    ride_id: i64,
    ride_date: Option<NaiveDate>,
}

impl<G> Clone for LocationReporter<G> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            geolocator: Arc::clone(&self.geolocator),
            role: self.role,
            ride_id: self.ride_id,
            ride_date: self.ride_date,
        }
    }
}

impl<G: Geolocator> LocationReporter<G> {
    #[must_use]
    pub fn new(ctx: &RideContext, client: Arc<TrackingClient>, geolocator: Arc<G>) -> Self {
        Self {
            client,
            geolocator,
            role: ctx.role,
            ride_id: ctx.ride_id,
            ride_date: ctx.ride_date,
        }
    }

    /// One report. Returns the server's acknowledgement text.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Geolocation`] when no position is available, otherwise
    /// the client's transport and decode failures.
    pub async fn report_once(&self) -> Result<String, TrackingError> {
        let position = self.geolocator.current_position().await?;
        let report = LocationReport {
            ride_id: self.ride_id,
            ride_date: self.ride_date,
            latitude: position.lat,
            longitude: position.lon,
        };
        self.client.report_location(self.role, &report).await
    }

    /// One timer tick. Failures are logged and dropped; the next tick tries again.
    pub async fn tick(&self) -> Option<String> {
        match self.report_once().await {
            Ok(ack) => Some(ack),
            Err(TrackingError::Geolocation(e)) => {
                tracing::debug!(error = %e, ride_id = self.ride_id, "no device position; skipping report");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, ride_id = self.ride_id, role = %self.role, "location report failed");
                None
            }
        }
    }
}
