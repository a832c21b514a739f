//! Coordinates and great-circle distance.
//!
//! Positions travel over the wire as two-element `[lat, lon]` arrays, so
//! [`Position`] serializes through that shape rather than as a struct.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for every distance in the tracker.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Driver/passenger separation at or below which the driver is offered to start the journey.
pub const NEARBY_START_RADIUS_M: f64 = 100.0;

/// Passenger/driver separation above which the passenger is offered to move their pickup pin.
pub const PICKUP_ADJUST_RADIUS_M: f64 = 250.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_m(&self, other: &Position) -> f64 {
        haversine_distance_m(self.lat, self.lon, other.lat, other.lon)
    }

    /// `true` when both axes differ by less than `epsilon_deg`.
    #[must_use]
    pub fn overlaps(&self, other: &Position, epsilon_deg: f64) -> bool {
        (self.lat - other.lat).abs() < epsilon_deg && (self.lon - other.lon).abs() < epsilon_deg
    }

    #[must_use]
    pub fn offset(&self, dlat: f64, dlon: f64) -> Position {
        Position::new(self.lat + dlat, self.lon + dlon)
    }
}

impl From<[f64; 2]> for Position {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.lat, p.lon]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Haversine distance between two coordinates, in meters.
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
