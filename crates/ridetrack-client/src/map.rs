//! Marker placement and viewport fitting for the tracking map.
//!
//! [`MapRenderer`] turns each poll snapshot into a [`MapView`]: the markers a
//! tile-based map would draw, the passenger clusters, and the viewport that
//! fits them. Rendering is recomputed from scratch on every snapshot.

use std::f64::consts::PI;

use ridetrack_core::{Position, RideContext, Role};

use crate::types::{LiveLocations, PassengerLocations};

pub const DEFAULT_CENTER: Position = Position::new(51.505, -0.09);
pub const DEFAULT_ZOOM: u8 = 13;
pub const PICKUP_ZOOM: u8 = 14;
pub const MAX_ZOOM: u8 = 18;

/// Two positions closer than this on both axes are drawn on top of each other.
pub const OVERLAP_EPSILON_DEG: f64 = 0.000_01;
pub const OVERLAP_NUDGE_DEG: f64 = 0.000_05;
pub const FIT_PADDING: f64 = 0.3;

/// Smallest bounds span on either axis, in degrees.
const MIN_SPAN_DEG: f64 = 0.002;
const VIEWPORT_WIDTH_PX: f64 = 800.0;
const VIEWPORT_HEIGHT_PX: f64 = 600.0;
const TILE_SIZE_PX: f64 = 256.0;
const CLUSTER_RADIUS_PX: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    Driver,
    /// `username` is set for commuting rides.
    Passenger { username: Option<String> },
    Pickup,
    PickupCandidate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub position: Position,
    pub label: String,
    /// Lives in the cluster layer rather than directly on the map.
    pub clustered: bool,
}

/// Several clustered markers drawn as one bubble at the fitted zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub center: Position,
    /// Indices into [`MapView::markers`].
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box holding every point, or `None` for no points.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Position>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for p in points {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lon);
            bounds.east = bounds.east.max(p.lon);
        }
        Some(bounds)
    }

    /// Grows each side by `ratio` of the span on that axis.
    #[must_use]
    pub fn pad(self, ratio: f64) -> Self {
        let dlat = (self.north - self.south) * ratio;
        let dlon = (self.east - self.west) * ratio;
        Self {
            south: self.south - dlat,
            west: self.west - dlon,
            north: self.north + dlat,
            east: self.east + dlon,
        }
    }

    /// Widens a degenerate box (single point, or a line) around its centre.
    #[must_use]
    pub fn with_min_span(self, span_deg: f64) -> Self {
        let center = self.center();
        let half = span_deg / 2.0;
        let mut out = self;
        if out.north - out.south < span_deg {
            out.south = center.lat - half;
            out.north = center.lat + half;
        }
        if out.east - out.west < span_deg {
            out.west = center.lon - half;
            out.east = center.lon + half;
        }
        out
    }

    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Highest zoom at which the whole box fits the viewport, capped at [`MAX_ZOOM`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn fit_zoom(&self) -> u8 {
        let lon_fraction = (self.east - self.west) / 360.0;
        let lat_fraction = (mercator_y(self.north) - mercator_y(self.south)) / (2.0 * PI);

        let zoom_for = |viewport_px: f64, fraction: f64| {
            if fraction <= 0.0 {
                f64::from(MAX_ZOOM)
            } else {
                (viewport_px / TILE_SIZE_PX / fraction).log2()
            }
        };
        zoom_for(VIEWPORT_WIDTH_PX, lon_fraction)
            .min(zoom_for(VIEWPORT_HEIGHT_PX, lat_fraction))
            .floor()
            .clamp(0.0, f64::from(MAX_ZOOM)) as u8
    }
}

/// Everything the map shows after one render.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub markers: Vec<Marker>,
    pub clusters: Vec<Cluster>,
    /// Padded bounds of the live markers; `None` when nobody has a position.
    pub bounds: Option<Bounds>,
    pub center: Position,
    pub zoom: u8,
}

impl MapView {
    pub fn markers_of<'a>(&'a self, kind: &'a MarkerKind) -> impl Iterator<Item = &'a Marker> {
        self.markers.iter().filter(move |m| &m.kind == kind)
    }

    #[must_use]
    pub fn driver(&self) -> Option<&Marker> {
        self.markers_of(&MarkerKind::Driver).next()
    }

    pub fn passengers(&self) -> impl Iterator<Item = &Marker> {
        self.markers
            .iter()
            .filter(|m| matches!(m.kind, MarkerKind::Passenger { .. }))
    }
}

#[derive(Debug)]
pub struct MapRenderer {
    role: Role,
    username: Option<String>,
    commuting: bool,
    pickup: Option<Position>,
    candidate: Option<Position>,
    last: Option<LiveLocations>,
    center: Position,
    zoom: u8,
}

impl MapRenderer {
    #[must_use]
    pub fn new(ctx: &RideContext) -> Self {
        Self {
            role: ctx.role,
            username: ctx.username.clone(),
            commuting: ctx.is_commuting(),
            pickup: None,
            candidate: None,
            last: None,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }

    /// Renders a fresh poll snapshot.
    pub fn render(&mut self, live: &LiveLocations) -> MapView {
        self.last = Some(live.clone());
        self.view()
    }

    /// Places the persistent pickup marker and recentres on it.
    pub fn set_pickup(&mut self, position: Position) -> MapView {
        self.pickup = Some(position);
        self.center = position;
        self.zoom = PICKUP_ZOOM;
        self.view()
    }

    /// Shows, moves or (with `None`) removes the candidate pickup marker.
    pub fn set_candidate(&mut self, position: Option<Position>) -> MapView {
        self.candidate = position;
        self.view()
    }

    /// Replaces the pickup marker with the confirmed candidate.
    pub fn promote_candidate(&mut self) -> MapView {
        if let Some(candidate) = self.candidate.take() {
            self.pickup = Some(candidate);
        }
        self.view()
    }

    fn view(&mut self) -> MapView {
        let mut markers = self
            .last
            .as_ref()
            .map(|live| self.live_markers(live))
            .unwrap_or_default();

        let bounds = Bounds::from_points(markers.iter().map(|m| &m.position))
            .map(|b| b.pad(FIT_PADDING).with_min_span(MIN_SPAN_DEG));
        if let Some(b) = bounds {
            self.center = b.center();
            self.zoom = b.fit_zoom();
        }

        if let Some(pickup) = self.pickup {
            markers.push(Marker {
                kind: MarkerKind::Pickup,
                position: pickup,
                label: "Pickup Location".to_owned(),
                clustered: false,
            });
        }
        if let Some(candidate) = self.candidate {
            markers.push(Marker {
                kind: MarkerKind::PickupCandidate,
                position: candidate,
                label: "New Pickup".to_owned(),
                clustered: false,
            });
        }

        let clusters = cluster(&markers, self.zoom);
        MapView {
            markers,
            clusters,
            bounds,
            center: self.center,
            zoom: self.zoom,
        }
    }

    fn live_markers(&self, live: &LiveLocations) -> Vec<Marker> {
        let mut markers = Vec::new();
        let driver = live.driver;

        let nudge = |p: Position| match driver {
            Some(d) if p.overlaps(&d, OVERLAP_EPSILON_DEG) => {
                p.offset(OVERLAP_NUDGE_DEG, OVERLAP_NUDGE_DEG)
            }
            _ => p,
        };

        match (&live.passenger, self.role) {
            (Some(PassengerLocations::Single(p)), role) => {
                let label = if role == Role::Passenger {
                    "Your location"
                } else {
                    "Passenger's location"
                };
                markers.push(Marker {
                    kind: MarkerKind::Passenger { username: None },
                    position: nudge(*p),
                    label: label.to_owned(),
                    clustered: self.commuting,
                });
            }
            (Some(PassengerLocations::PerPassenger(map)), Role::Driver) => {
                for (username, p) in map {
                    markers.push(Marker {
                        kind: MarkerKind::Passenger {
                            username: Some(username.clone()),
                        },
                        position: nudge(*p),
                        label: format!("Passenger: {username}"),
                        clustered: true,
                    });
                }
            }
            (Some(PassengerLocations::PerPassenger(map)), Role::Passenger) => {
                let own = self
                    .username
                    .as_deref()
                    .and_then(|u| map.get_key_value(u));
                if let Some((username, p)) = own {
                    markers.push(Marker {
                        kind: MarkerKind::Passenger {
                            username: Some(username.clone()),
                        },
                        position: nudge(*p),
                        label: "Your location".to_owned(),
                        clustered: true,
                    });
                }
            }
            (None, _) => {}
        }

        if let Some(d) = driver {
            let label = if self.role == Role::Driver {
                "Your location"
            } else {
                "Driver's location"
            };
            markers.push(Marker {
                kind: MarkerKind::Driver,
                position: d,
                label: label.to_owned(),
                clustered: false,
            });
        }
        markers
    }
}

/// Greedy grouping of clustered markers that land within
/// [`CLUSTER_RADIUS_PX`] of a group's first member at `zoom`.
fn cluster(markers: &[Marker], zoom: u8) -> Vec<Cluster> {
    let mut groups: Vec<((f64, f64), Vec<usize>)> = Vec::new();
    for (i, marker) in markers.iter().enumerate().filter(|(_, m)| m.clustered) {
        let px = project(&marker.position, zoom);
        let joined = groups.iter_mut().find(|(seed, _)| {
            let (dx, dy) = (seed.0 - px.0, seed.1 - px.1);
            dx.hypot(dy) <= CLUSTER_RADIUS_PX
        });
        match joined {
            Some((_, members)) => members.push(i),
            None => groups.push((px, vec![i])),
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(_, members)| {
            #[allow(clippy::cast_precision_loss)]
            let n = members.len() as f64;
            let (lat, lon) = members.iter().fold((0.0, 0.0), |(lat, lon), &i| {
                (lat + markers[i].position.lat, lon + markers[i].position.lon)
            });
            Cluster {
                center: Position::new(lat / n, lon / n),
                members,
            }
        })
        .collect()
}

fn mercator_y(lat_deg: f64) -> f64 {
    let lat = lat_deg.clamp(-85.051_128, 85.051_128).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln()
}

/// World pixel coordinates of `p` at `zoom`.
fn project(p: &Position, zoom: u8) -> (f64, f64) {
    let scale = TILE_SIZE_PX * 2f64.powi(i32::from(zoom));
    let x = (p.lon + 180.0) / 360.0 * scale;
    let y = (1.0 - mercator_y(p.lat) / PI) / 2.0 * scale;
    (x, y)
}

#[cfg(test)]
#[path = "map_test.rs"]
mod tests;
