//! Request and response bodies for the marketplace tracking endpoints.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ridetrack_core::{Position, Rating};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body for `/api/track_{role}_location`.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub ride_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_date: Option<NaiveDate>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Body for `/api/start_journey`, `/api/finish_journey` and `/api/ride_status`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RideRef {
    pub ride_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_date: Option<NaiveDate>,
}

/// Body for `/api/update_passenger_pickup_location`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PickupUpdate {
    pub ride_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Body for `/api/submit_rating`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RatingRequest {
    pub ride_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_date: Option<NaiveDate>,
    pub rating: Rating,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `{ "message": "..." }` acknowledgement returned by most POST endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PickupLocationResponse {
    #[serde(default)]
    pub from_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RideStatusResponse {
    pub status: String,
}

/// Successful `/api/submit_rating` reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RatingReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Passenger coordinates as returned by the live-location endpoints.
///
/// One-time rides carry a single `[lat, lon]` pair; commuting rides carry a
/// map keyed by passenger username.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PassengerLocations {
    Single(Position),
    PerPassenger(BTreeMap<String, Position>),
}

/// Snapshot returned by `/api/get_live_locations` and `/api/get_commute_live_locations`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveLocations {
    #[serde(default)]
    pub driver: Option<Position>,
    #[serde(default)]
    pub passenger: Option<PassengerLocations>,
    /// Server-computed proximity flag; `null` and absent both read as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub nearby: bool,
}

impl LiveLocations {
    /// Position of the passenger whose view this is.
    ///
    /// A one-time ride has exactly one passenger, so the single pair is
    /// theirs regardless of `username`.
    #[must_use]
    pub fn passenger_position(&self, username: Option<&str>) -> Option<Position> {
        match self.passenger.as_ref()? {
            PassengerLocations::Single(p) => Some(*p),
            PassengerLocations::PerPassenger(map) => username.and_then(|u| map.get(u)).copied(),
        }
    }
}

/// One match from a Nominatim-style `/search?format=json` lookup.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeMatch {
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lon: f64,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Nominatim sends coordinates as strings; other geocoders send numbers.
fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}
