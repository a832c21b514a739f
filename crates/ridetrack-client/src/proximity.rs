//! Journey state machine driven by proximity signals and user actions.
//!
//! [`JourneyTracker`] owns everything one ride view knows about the journey:
//! the ride-level [`JourneyState`], which passengers were prompted, dismissed
//! or started, and whether a rating may be submitted. It performs no I/O.
//! Every method returns the [`Effect`]s the session must carry out.
//!
//! Nearby detection is per passenger for commuting rides, but the journey
//! clock is ride-wide: one `Ongoing`/`Finished` flag covers every passenger
//! of the occurrence.

use std::collections::BTreeMap;

use ridetrack_core::{
    JourneyState, Position, Rating, RideContext, RideStatus, Role, NEARBY_START_RADIUS_M,
};

use crate::types::{LiveLocations, PassengerLocations};
use crate::ui::{Effect, Outbound, UiEvent};

pub const START_FAILED_ALERT: &str = "Something went wrong.";
const NOT_STARTED_ALERT: &str = "The journey has not started yet.";
const RATING_LOCKED_ALERT: &str = "You can rate this ride once the journey has finished.";

/// Remembers that a nearby prompt was closed without starting, and where the
/// passenger was at that moment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DismissalRecord {
    pub dismissed: bool,
    pub last_position: Option<Position>,
}

impl DismissalRecord {
    fn dismiss(&mut self, at: Option<Position>) {
        self.dismissed = true;
        if at.is_some() {
            self.last_position = at;
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PassengerProgress {
    dismissal: DismissalRecord,
    started: bool,
    start_pending: bool,
}

impl PassengerProgress {
    fn awaiting_reminder(&self) -> bool {
        self.dismissal.dismissed && !self.started && !self.start_pending
    }
}

/// Who the active nearby prompt is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptTarget {
    /// One-time ride: the ride's only passenger.
    Ride,
    Passenger(String),
}

#[derive(Debug, Clone)]
struct ActivePrompt {
    target: PromptTarget,
    position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RatingProgress {
    Locked,
    Available,
    InFlight,
    Submitted,
}

#[derive(Debug)]
pub struct JourneyTracker {
    role: Role,
    commuting: bool,
    state: JourneyState,
    prompt: Option<ActivePrompt>,
    /// One-time rides show the nearby modal at most once per session.
    modal_shown: bool,
    ride_dismissal: DismissalRecord,
    passengers: BTreeMap<String, PassengerProgress>,
    reminder_visible: bool,
    ride_start_pending: bool,
    finish_pending: bool,
    rating: RatingProgress,
}

impl JourneyTracker {
    #[must_use]
    pub fn new(ctx: &RideContext) -> Self {
        let state = ctx.initial_status.journey_state();
        let rating = if ctx.role == Role::Passenger && state.is_terminal() {
            RatingProgress::Available
        } else {
            RatingProgress::Locked
        };
        Self {
            role: ctx.role,
            commuting: ctx.is_commuting(),
            state,
            prompt: None,
            modal_shown: false,
            ride_dismissal: DismissalRecord::default(),
            passengers: BTreeMap::new(),
            reminder_visible: false,
            ride_start_pending: false,
            finish_pending: false,
            rating,
        }
    }

    /// Effects owed for the state the page was loaded in.
    #[must_use]
    pub fn initial_effects(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state.is_terminal() {
            effects.push(Effect::Ui(UiEvent::JourneyFinished { message: None }));
            if self.rating == RatingProgress::Available {
                effects.push(Effect::Ui(UiEvent::RatingAvailable));
            }
        }
        effects
    }

    #[must_use]
    pub fn state(&self) -> JourneyState {
        self.state
    }

    /// Journey state from the point of view of one passenger.
    #[must_use]
    pub fn passenger_state(&self, username: &str) -> JourneyState {
        if self.state.is_terminal() {
            return JourneyState::Finished;
        }
        let prompted = matches!(
            &self.prompt,
            Some(ActivePrompt { target: PromptTarget::Passenger(name), .. }) if name == username
        );
        match self.passengers.get(username) {
            Some(p) if p.started => JourneyState::Ongoing,
            Some(p) if p.dismissal.dismissed || p.start_pending => JourneyState::NearbyPending,
            _ if prompted => JourneyState::NearbyPending,
            _ => JourneyState::NotStarted,
        }
    }

    #[must_use]
    pub fn prompt_target(&self) -> Option<&PromptTarget> {
        self.prompt.as_ref().map(|p| &p.target)
    }

    #[must_use]
    pub fn reminder_visible(&self) -> bool {
        self.reminder_visible
    }

    /// Dismissed passengers still waiting to be started, in username order.
    #[must_use]
    pub fn reminder_passengers(&self) -> Vec<String> {
        self.passengers
            .iter()
            .filter(|(_, p)| p.awaiting_reminder())
            .map(|(name, _)| name.clone())
            .collect()
    }

    #[must_use]
    pub fn dismissal(&self, target: &PromptTarget) -> Option<&DismissalRecord> {
        match target {
            PromptTarget::Ride => Some(&self.ride_dismissal),
            PromptTarget::Passenger(name) => self.passengers.get(name).map(|p| &p.dismissal),
        }
    }

    #[must_use]
    pub fn can_rate(&self) -> bool {
        self.rating == RatingProgress::Available
    }

    /// Evaluates one poll snapshot for nearby prompts. Driver only.
    pub fn observe(&mut self, live: &LiveLocations) -> Vec<Effect> {
        if self.role != Role::Driver || self.state.is_terminal() {
            return Vec::new();
        }
        if self.commuting {
            self.observe_commute(live)
        } else {
            self.observe_one_time(live)
        }
    }

    fn observe_one_time(&mut self, live: &LiveLocations) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state >= JourneyState::Ongoing || self.ride_start_pending {
            return effects;
        }

        if live.nearby {
            if !self.modal_shown {
                self.modal_shown = true;
                self.prompt = Some(ActivePrompt {
                    target: PromptTarget::Ride,
                    position: live.passenger_position(None),
                });
                self.state.advance(JourneyState::NearbyPending);
                tracing::info!("passenger nearby; prompting driver to start journey");
                effects.push(Effect::Ui(UiEvent::NearbyPrompt { passenger: None }));
            } else if self.ride_dismissal.dismissed && !self.reminder_visible {
                self.reminder_visible = true;
                effects.push(Effect::Ui(UiEvent::Reminder {
                    passengers: Vec::new(),
                }));
            }
        } else if self.reminder_visible {
            // The driver moved away; the reminder comes back when they are close again.
            self.reminder_visible = false;
            effects.push(Effect::Ui(UiEvent::ReminderHidden));
        }
        effects
    }

    fn observe_commute(&mut self, live: &LiveLocations) -> Vec<Effect> {
        let mut effects = Vec::new();
        let (Some(driver), Some(PassengerLocations::PerPassenger(passengers))) =
            (live.driver, live.passenger.as_ref())
        else {
            return effects;
        };

        for (username, position) in passengers {
            if self.prompt.is_some() {
                break;
            }
            let progress = self.passengers.entry(username.clone()).or_default();
            if progress.dismissal.dismissed || progress.started || progress.start_pending {
                continue;
            }
            let distance_m = position.distance_m(&driver);
            if distance_m <= NEARBY_START_RADIUS_M {
                self.prompt = Some(ActivePrompt {
                    target: PromptTarget::Passenger(username.clone()),
                    position: Some(*position),
                });
                self.state.advance(JourneyState::NearbyPending);
                tracing::info!(passenger = %username, distance_m, "passenger nearby; prompting driver");
                effects.push(Effect::Ui(UiEvent::NearbyPrompt {
                    passenger: Some(username.clone()),
                }));
            }
        }
        effects
    }

    /// Driver accepts the active nearby prompt.
    pub fn confirm_start(&mut self) -> Vec<Effect> {
        let Some(prompt) = self.prompt.take() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::Ui(UiEvent::PromptClosed)];
        let passengers = match prompt.target {
            PromptTarget::Ride => Vec::new(),
            PromptTarget::Passenger(name) => vec![name],
        };
        effects.extend(self.begin_start(passengers));
        effects
    }

    /// Driver closes the active nearby prompt without starting.
    pub fn dismiss_prompt(&mut self) -> Vec<Effect> {
        let Some(prompt) = self.prompt.take() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::Ui(UiEvent::PromptClosed)];
        match prompt.target {
            PromptTarget::Ride => {
                self.ride_dismissal.dismiss(prompt.position);
                self.reminder_visible = true;
                effects.push(Effect::Ui(UiEvent::Reminder {
                    passengers: Vec::new(),
                }));
            }
            PromptTarget::Passenger(name) => {
                tracing::info!(passenger = %name, "nearby prompt dismissed");
                self.passengers
                    .entry(name)
                    .or_default()
                    .dismissal
                    .dismiss(prompt.position);
                self.reminder_visible = true;
                effects.push(Effect::Ui(UiEvent::Reminder {
                    passengers: self.reminder_passengers(),
                }));
            }
        }
        effects
    }

    /// Driver clicks the reminder to start retroactively.
    pub fn click_reminder(&mut self) -> Vec<Effect> {
        if !self.reminder_visible {
            return Vec::new();
        }
        if self.commuting {
            return self.start_all();
        }
        if !self.ride_dismissal.dismissed || self.ride_start_pending {
            return Vec::new();
        }
        self.reminder_visible = false;
        let mut effects = vec![Effect::Ui(UiEvent::ReminderHidden)];
        effects.extend(self.begin_start(Vec::new()));
        effects
    }

    /// Starts every reminded passenger plus the one currently prompted, in one request.
    pub fn start_all(&mut self) -> Vec<Effect> {
        if !self.commuting {
            return if self.prompt.is_some() {
                self.confirm_start()
            } else {
                self.click_reminder()
            };
        }

        let mut effects = Vec::new();
        let mut passengers = self.reminder_passengers();
        if let Some(ActivePrompt {
            target: PromptTarget::Passenger(name),
            ..
        }) = self.prompt.take()
        {
            effects.push(Effect::Ui(UiEvent::PromptClosed));
            passengers.push(name);
        }
        if passengers.is_empty() {
            return effects;
        }
        if self.reminder_visible {
            self.reminder_visible = false;
            effects.push(Effect::Ui(UiEvent::ReminderHidden));
        }
        effects.extend(self.begin_start(passengers));
        effects
    }

    fn begin_start(&mut self, passengers: Vec<String>) -> Vec<Effect> {
        if passengers.is_empty() {
            self.ride_start_pending = true;
        }
        for name in &passengers {
            self.passengers.entry(name.clone()).or_default().start_pending = true;
        }
        vec![Effect::Send(Outbound::StartJourney { passengers })]
    }

    /// The server acknowledged `start_journey` for `passengers`.
    pub fn start_succeeded(&mut self, passengers: &[String], message: Option<String>) -> Vec<Effect> {
        let message = message.unwrap_or_else(|| "Journey started!".to_owned());
        if passengers.is_empty() {
            self.ride_start_pending = false;
        }
        for name in passengers {
            let progress = self.passengers.entry(name.clone()).or_default();
            progress.start_pending = false;
            progress.started = true;
        }

        let mut effects = vec![Effect::Ui(UiEvent::Status(message.clone()))];
        if self.state.advance(JourneyState::Ongoing) {
            tracing::info!("journey started");
            effects.push(Effect::Ui(UiEvent::JourneyStarted { message }));
        }

        if self.commuting && self.reminder_visible {
            let remaining = self.reminder_passengers();
            if remaining.is_empty() {
                self.reminder_visible = false;
                effects.push(Effect::Ui(UiEvent::ReminderHidden));
            }
        } else if !self.commuting && self.reminder_visible {
            self.reminder_visible = false;
            effects.push(Effect::Ui(UiEvent::ReminderHidden));
        }
        effects
    }

    /// `start_journey` failed; the passengers go back to the reminder so the
    /// driver can retry.
    pub fn start_failed(&mut self, passengers: &[String], alert: String) -> Vec<Effect> {
        if passengers.is_empty() {
            self.ride_start_pending = false;
            self.ride_dismissal.dismissed = true;
        }
        for name in passengers {
            let progress = self.passengers.entry(name.clone()).or_default();
            progress.start_pending = false;
            progress.dismissal.dismissed = true;
        }

        let mut effects = vec![Effect::Ui(UiEvent::Alert(alert))];
        if self.state < JourneyState::Ongoing {
            self.reminder_visible = true;
            let passengers = if self.commuting {
                self.reminder_passengers()
            } else {
                Vec::new()
            };
            effects.push(Effect::Ui(UiEvent::Reminder { passengers }));
        }
        effects
    }

    /// Driver ends the journey.
    pub fn request_finish(&mut self) -> Vec<Effect> {
        if self.role != Role::Driver || self.state.is_terminal() || self.finish_pending {
            return Vec::new();
        }
        if self.state != JourneyState::Ongoing {
            return vec![Effect::Ui(UiEvent::Alert(NOT_STARTED_ALERT.to_owned()))];
        }
        self.finish_pending = true;
        vec![Effect::Send(Outbound::FinishJourney)]
    }

    pub fn finish_succeeded(&mut self, message: Option<String>) -> Vec<Effect> {
        self.finish_pending = false;
        self.mark_finished(Some(message.unwrap_or_else(|| "Journey finished.".to_owned())))
    }

    pub fn finish_failed(&mut self, alert: String) -> Vec<Effect> {
        self.finish_pending = false;
        vec![Effect::Ui(UiEvent::Alert(alert))]
    }

    /// Folds in a server-reported ride status (passenger status poll).
    pub fn observe_status(&mut self, status: &RideStatus) -> Vec<Effect> {
        match status {
            RideStatus::Done => self.mark_finished(None),
            RideStatus::Ongoing if self.state.advance(JourneyState::Ongoing) => {
                vec![Effect::Ui(UiEvent::JourneyStarted {
                    message: "Your journey has started.".to_owned(),
                })]
            }
            RideStatus::Ongoing | RideStatus::Pending(_) => Vec::new(),
        }
    }

    /// Both finish paths land here; only the first one produces a banner.
    fn mark_finished(&mut self, message: Option<String>) -> Vec<Effect> {
        if !self.state.advance(JourneyState::Finished) {
            return Vec::new();
        }
        tracing::info!("journey finished");
        let mut effects = Vec::new();
        if self.prompt.take().is_some() {
            effects.push(Effect::Ui(UiEvent::PromptClosed));
        }
        if self.reminder_visible {
            self.reminder_visible = false;
            effects.push(Effect::Ui(UiEvent::ReminderHidden));
        }
        if let Some(message) = &message {
            effects.push(Effect::Ui(UiEvent::Status(message.clone())));
        }
        effects.push(Effect::Ui(UiEvent::JourneyFinished { message }));
        if self.role == Role::Passenger {
            self.rating = RatingProgress::Available;
            effects.push(Effect::Ui(UiEvent::RatingAvailable));
        }
        effects
    }

    /// Passenger picks a star rating.
    pub fn submit_rating(&mut self, rating: Rating) -> Vec<Effect> {
        if self.role != Role::Passenger {
            return Vec::new();
        }
        match self.rating {
            RatingProgress::Locked => {
                vec![Effect::Ui(UiEvent::Alert(RATING_LOCKED_ALERT.to_owned()))]
            }
            RatingProgress::InFlight => Vec::new(),
            // The server decides whether a repeat rating is allowed.
            RatingProgress::Available | RatingProgress::Submitted => {
                self.rating = RatingProgress::InFlight;
                vec![Effect::Send(Outbound::SubmitRating(rating))]
            }
        }
    }

    pub fn rating_accepted(
        &mut self,
        message: Option<String>,
        redirect_url: Option<String>,
    ) -> Vec<Effect> {
        self.rating = RatingProgress::Submitted;
        vec![Effect::Ui(UiEvent::RatingSubmitted {
            message: message.unwrap_or_else(|| "Rating submitted.".to_owned()),
            redirect_url,
        })]
    }

    /// The server refused the rating; its message is shown and nothing redirects.
    pub fn rating_failed(&mut self, alert: String) -> Vec<Effect> {
        self.rating = RatingProgress::Available;
        vec![Effect::Ui(UiEvent::Alert(alert))]
    }
}

#[cfg(test)]
#[path = "proximity_test.rs"]
mod tests;
