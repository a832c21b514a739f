//! The boundary between a tracking session and whatever displays it.
//!
//! A session emits [`UiEvent`]s (modals, banners, map updates) and accepts
//! [`UiCommand`]s (button and map clicks). Internally the state machines
//! produce [`Effect`]s, which are either UI events or outbound requests.

use ridetrack_core::{Position, Rating};

use crate::map::MapView;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Replace the status line.
    Status(String),
    MapUpdated(MapView),
    /// "Passenger is nearby, start the journey?" For commuting rides the
    /// prompt names the passenger.
    NearbyPrompt { passenger: Option<String> },
    PromptClosed,
    /// Persistent reminder to start the journey later. Lists the dismissed
    /// passengers of a commuting ride (a "start all" action when more than
    /// one); empty for one-time rides.
    Reminder { passengers: Vec<String> },
    ReminderHidden,
    JourneyStarted { message: String },
    /// Finished banner. Emitted at most once per session.
    JourneyFinished { message: Option<String> },
    /// The passenger may now submit a 1–5 star rating.
    RatingAvailable,
    RatingSubmitted {
        message: String,
        redirect_url: Option<String>,
    },
    /// "Your pickup is far from the driver, adjust it?"
    AdjustPickupPrompt { distance_m: f64 },
    AdjustPickupClosed,
    /// Waiting for a map click that chooses the new pickup point.
    PickupSelecting,
    PickupCandidate(Position),
    PickupUpdated { message: String },
    /// Blocking, user-facing alert.
    Alert(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Driver accepts the active nearby prompt.
    ConfirmStart,
    /// Driver closes the active nearby prompt without starting.
    DismissPrompt,
    /// Driver clicks the reminder; starts every reminded passenger.
    ClickReminder,
    /// Driver starts every dismissed or currently prompted passenger at once.
    StartAll,
    FinishJourney,
    SubmitRating(Rating),
    AcceptPickupAdjust,
    DeclinePickupAdjust,
    MapClick(Position),
    ConfirmPickup,
    Shutdown,
}

/// Outbound request a state machine asks the session to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// `passengers` is empty for one-time rides.
    StartJourney { passengers: Vec<String> },
    FinishJourney,
    SubmitRating(Rating),
    UpdatePickup(Position),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Ui(UiEvent),
    Send(Outbound),
}
