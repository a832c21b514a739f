//! Device position providers.
//!
//! The reporter asks a [`Geolocator`] for the current position on every
//! tick. Providers may fail; the reporter treats every failure as "no update
//! this tick".

use std::future::Future;

use ridetrack_core::Position;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("permission to read the device position was denied")]
    PermissionDenied,

    #[error("device position is unavailable")]
    Unavailable,
}

/// Source of the local device's coordinates.
pub trait Geolocator: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<Position, GeolocationError>> + Send;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Position);

impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Ok(self.0)
    }
}

/// Never has a position, as when the user declined location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedGeolocator;

impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        Err(GeolocationError::PermissionDenied)
    }
}

/// Position fed by the host at any time through a [`PositionFeed`].
#[derive(Debug, Clone)]
pub struct SharedGeolocator {
    rx: watch::Receiver<Option<Position>>,
}

/// Writer half of a [`SharedGeolocator`].
#[derive(Debug)]
pub struct PositionFeed {
    tx: watch::Sender<Option<Position>>,
}

impl SharedGeolocator {
    #[must_use]
    pub fn new(initial: Option<Position>) -> (Self, PositionFeed) {
        let (tx, rx) = watch::channel(initial);
        (Self { rx }, PositionFeed { tx })
    }
}

impl Geolocator for SharedGeolocator {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        (*self.rx.borrow()).ok_or(GeolocationError::Unavailable)
    }
}

impl PositionFeed {
    pub fn set(&self, position: Position) {
        self.tx.send_replace(Some(position));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}
