//! Passenger-side pickup adjustment.
//!
//! When the passenger is far from the driver the map offers to move the
//! pickup point. The flow is a small state machine: prompt, pick a point by
//! clicking the map (re-clicking moves it), confirm, send. It runs at most
//! once per session.

use ridetrack_core::{Position, RideContext, Role, PICKUP_ADJUST_RADIUS_M};

use crate::types::LiveLocations;
use crate::ui::{Effect, Outbound, UiEvent};

pub const PICKUP_FAILED_ALERT: &str = "Error updating pickup location.";
const NO_CANDIDATE_ALERT: &str = "Click on the map to choose a new pickup point first.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdjustPhase {
    Watching,
    Prompted,
    /// Map clicks are captured; `candidate` is the latest one.
    Selecting { candidate: Option<Position> },
    Submitting(Position),
    Adjusted,
    Declined,
}

#[derive(Debug)]
pub struct PickupAdjuster {
    enabled: bool,
    username: Option<String>,
    phase: AdjustPhase,
}

impl PickupAdjuster {
    #[must_use]
    pub fn new(ctx: &RideContext) -> Self {
        Self {
            enabled: ctx.role == Role::Passenger,
            username: ctx.username.clone(),
            phase: AdjustPhase::Watching,
        }
    }

    #[must_use]
    pub fn phase(&self) -> AdjustPhase {
        self.phase
    }

    /// Whether map clicks should be routed here.
    #[must_use]
    pub fn captures_clicks(&self) -> bool {
        matches!(self.phase, AdjustPhase::Selecting { .. })
    }

    /// Checks the passenger's distance to the driver after a poll.
    pub fn observe(&mut self, live: &LiveLocations) -> Vec<Effect> {
        if !self.enabled || self.phase != AdjustPhase::Watching {
            return Vec::new();
        }
        let (Some(driver), Some(own)) = (
            live.driver,
            live.passenger_position(self.username.as_deref()),
        ) else {
            return Vec::new();
        };

        let distance_m = own.distance_m(&driver);
        if distance_m <= PICKUP_ADJUST_RADIUS_M {
            return Vec::new();
        }
        tracing::info!(distance_m, "passenger far from driver; offering pickup adjustment");
        self.phase = AdjustPhase::Prompted;
        vec![Effect::Ui(UiEvent::AdjustPickupPrompt { distance_m })]
    }

    pub fn accept(&mut self) -> Vec<Effect> {
        if self.phase != AdjustPhase::Prompted {
            return Vec::new();
        }
        self.phase = AdjustPhase::Selecting { candidate: None };
        vec![
            Effect::Ui(UiEvent::AdjustPickupClosed),
            Effect::Ui(UiEvent::PickupSelecting),
        ]
    }

    pub fn decline(&mut self) -> Vec<Effect> {
        if self.phase != AdjustPhase::Prompted {
            return Vec::new();
        }
        self.phase = AdjustPhase::Declined;
        vec![Effect::Ui(UiEvent::AdjustPickupClosed)]
    }

    pub fn map_click(&mut self, at: Position) -> Vec<Effect> {
        let AdjustPhase::Selecting { candidate } = &mut self.phase else {
            return Vec::new();
        };
        *candidate = Some(at);
        vec![Effect::Ui(UiEvent::PickupCandidate(at))]
    }

    /// Sends the chosen point. Clicks stop being captured from here on.
    pub fn confirm(&mut self) -> Vec<Effect> {
        match self.phase {
            AdjustPhase::Selecting {
                candidate: Some(point),
            } => {
                self.phase = AdjustPhase::Submitting(point);
                vec![Effect::Send(Outbound::UpdatePickup(point))]
            }
            AdjustPhase::Selecting { candidate: None } => {
                vec![Effect::Ui(UiEvent::Alert(NO_CANDIDATE_ALERT.to_owned()))]
            }
            _ => Vec::new(),
        }
    }

    pub fn succeeded(&mut self, message: Option<String>) -> Vec<Effect> {
        if !matches!(self.phase, AdjustPhase::Submitting(_)) {
            return Vec::new();
        }
        self.phase = AdjustPhase::Adjusted;
        vec![Effect::Ui(UiEvent::PickupUpdated {
            message: message.unwrap_or_else(|| "Pickup location updated.".to_owned()),
        })]
    }

    /// The update failed. The session's one adjustment is spent either way.
    pub fn failed(&mut self, alert: String) -> Vec<Effect> {
        if !matches!(self.phase, AdjustPhase::Submitting(_)) {
            return Vec::new();
        }
        self.phase = AdjustPhase::Declined;
        vec![Effect::Ui(UiEvent::Alert(alert))]
    }
}
