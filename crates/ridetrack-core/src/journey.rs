//! Journey lifecycle values shared by the tracker and the server contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one ride occurrence as seen by the client.
///
/// Ordered: a state only ever moves to a later variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyState {
    NotStarted,
    NearbyPending,
    Ongoing,
    Finished,
}

impl JourneyState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == JourneyState::Finished
    }

    /// Moves to `next` if it is later than the current state.
    ///
    /// Returns `true` when the state changed. Backward or repeated moves are
    /// ignored, which makes every transition idempotent.
    pub fn advance(&mut self, next: JourneyState) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl std::fmt::Display for JourneyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JourneyState::NotStarted => "not_started",
            JourneyState::NearbyPending => "nearby_pending",
            JourneyState::Ongoing => "ongoing",
            JourneyState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Ride status string as reported by the server (`/api/ride_status`, page field).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideStatus {
    /// Booked or otherwise not under way.
    Pending(String),
    Ongoing,
    Done,
}

impl RideStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "done" | "finished" | "completed" => RideStatus::Done,
            "ongoing" | "started" => RideStatus::Ongoing,
            _ => RideStatus::Pending(raw.trim().to_string()),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Done)
    }

    /// Client-side journey state implied by this server status.
    #[must_use]
    pub fn journey_state(&self) -> JourneyState {
        match self {
            RideStatus::Pending(_) => JourneyState::NotStarted,
            RideStatus::Ongoing => JourneyState::Ongoing,
            RideStatus::Done => JourneyState::Finished,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

/// Star rating a passenger gives a finished ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] unless `value` is in `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Rating)
            .ok_or(RatingError::OutOfRange(value))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}
