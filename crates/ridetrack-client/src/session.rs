//! The tracking session: timers, in-flight requests and the state machines
//! for one open ride view.
//!
//! A session is a single-owner event loop. Timer ticks and UI commands wake
//! it up; every HTTP call runs as a task in a [`JoinSet`] whose completion
//! re-enters the loop. All journey, map and pickup state is owned by the
//! loop, so no locking is needed. The loop ends, aborting every timer and
//! in-flight request, on [`UiCommand::Shutdown`], when the command channel
//! closes, or when the host's shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ridetrack_core::{AppConfig, JourneyState, Position, RideContext, RideStatus, Role};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::client::TrackingClient;
use crate::error::TrackingError;
use crate::geocode::Geocoder;
use crate::geolocation::Geolocator;
use crate::map::MapRenderer;
use crate::pickup::{PickupAdjuster, PICKUP_FAILED_ALERT};
use crate::poller::{LiveLocationPoller, RideStatusPoller};
use crate::proximity::{JourneyTracker, START_FAILED_ALERT};
use crate::reporter::LocationReporter;
use crate::types::{LiveLocations, PickupUpdate, RatingReceipt, RatingRequest, RideRef};
use crate::ui::{Effect, Outbound, UiCommand, UiEvent};

const FINISH_FAILED_ALERT: &str = "Could not finish the journey. Please try again.";
const RATING_FAILED_ALERT: &str = "Could not submit your rating. Please try again.";

/// Timer periods for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub report_interval: Duration,
    pub poll_interval: Duration,
    /// Delay before the first poll, so the first report lands first.
    pub poll_offset: Duration,
    pub status_interval: Duration,
}

impl SessionTimings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            report_interval: config.report_interval(),
            poll_interval: config.poll_interval(),
            poll_offset: config.poll_offset(),
            status_interval: config.status_interval(),
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            poll_offset: Duration::from_millis(1_500),
            status_interval: Duration::from_secs(5),
        }
    }
}

/// Result of a spawned request, fed back into the loop.
#[derive(Debug)]
enum Completion {
    Reported(Option<String>),
    Polled(Option<LiveLocations>),
    Status(Option<RideStatus>),
    PickupGeocoded(Option<Position>),
    Started {
        passengers: Vec<String>,
        result: Result<Option<String>, TrackingError>,
    },
    Finished(Result<Option<String>, TrackingError>),
    Rated(Result<RatingReceipt, TrackingError>),
    PickupUpdated(Result<Option<String>, TrackingError>),
}

enum Wake {
    Report,
    Poll,
    Status,
    Command(Option<UiCommand>),
    Done(Result<Completion, JoinError>),
    Shutdown,
}

pub struct TrackingSession<G> {
    ctx: RideContext,
    client: Arc<TrackingClient>,
    geocoder: Option<Geocoder>,
    reporter: LocationReporter<G>,
    poller: LiveLocationPoller,
    status: RideStatusPoller,
    tracker: JourneyTracker,
    map: MapRenderer,
    pickup: PickupAdjuster,
    timings: SessionTimings,
    events: mpsc::UnboundedSender<UiEvent>,
    tasks: JoinSet<Completion>,
}

impl<G: Geolocator + 'static> TrackingSession<G> {
    /// Builds a session and the receiver its UI events are delivered to.
    #[must_use]
    pub fn new(
        ctx: RideContext,
        client: TrackingClient,
        geolocator: G,
        timings: SessionTimings,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let client = Arc::new(client);
        let session = Self {
            reporter: LocationReporter::new(&ctx, Arc::clone(&client), Arc::new(geolocator)),
            poller: LiveLocationPoller::new(&ctx, Arc::clone(&client)),
            status: RideStatusPoller::new(&ctx, Arc::clone(&client)),
            tracker: JourneyTracker::new(&ctx),
            map: MapRenderer::new(&ctx),
            pickup: PickupAdjuster::new(&ctx),
            geocoder: None,
            client,
            ctx,
            timings,
            events,
            tasks: JoinSet::new(),
        };
        (session, rx)
    }

    /// Enables the pickup marker lookup at start-up.
    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Geocoder) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Runs until shut down and returns the journey state at that moment.
    pub async fn run<S>(mut self, mut commands: mpsc::Receiver<UiCommand>, shutdown: S) -> JourneyState
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let (mut report, mut poll, mut status) = schedule(&self.timings);
        let polls_status = self.ctx.role == Role::Passenger;

        tracing::info!(
            ride_id = self.ctx.ride_id,
            role = %self.ctx.role,
            commuting = self.ctx.is_commuting(),
            state = %self.tracker.state(),
            "tracking session started"
        );
        let initial = self.tracker.initial_effects();
        self.dispatch(initial);
        self.spawn_pickup_lookup();

        loop {
            let wake = tokio::select! {
                () = &mut shutdown => Wake::Shutdown,
                cmd = commands.recv() => Wake::Command(cmd),
                _ = report.tick() => Wake::Report,
                _ = poll.tick() => Wake::Poll,
                _ = status.tick(), if polls_status && !self.tracker.state().is_terminal() => Wake::Status,
                Some(done) = self.tasks.join_next(), if !self.tasks.is_empty() => Wake::Done(done),
            };

            match wake {
                Wake::Shutdown | Wake::Command(None | Some(UiCommand::Shutdown)) => break,
                Wake::Command(Some(cmd)) => self.command(cmd),
                Wake::Report => {
                    let reporter = self.reporter.clone();
                    self.tasks
                        .spawn(async move { Completion::Reported(reporter.tick().await) });
                }
                Wake::Poll => {
                    let poller = self.poller.clone();
                    self.tasks
                        .spawn(async move { Completion::Polled(poller.tick().await) });
                }
                Wake::Status => {
                    let poller = self.status.clone();
                    self.tasks
                        .spawn(async move { Completion::Status(poller.tick().await) });
                }
                Wake::Done(Ok(completion)) => self.complete(completion),
                Wake::Done(Err(e)) => {
                    if !e.is_cancelled() {
                        tracing::error!(error = %e, "tracking task panicked");
                    }
                }
            }
        }

        self.tasks.abort_all();
        tracing::info!(
            ride_id = self.ctx.ride_id,
            state = %self.tracker.state(),
            "tracking session stopped"
        );
        self.tracker.state()
    }

    fn command(&mut self, cmd: UiCommand) {
        tracing::debug!(command = ?cmd, "ui command");
        let effects = match cmd {
            UiCommand::ConfirmStart => self.tracker.confirm_start(),
            UiCommand::DismissPrompt => self.tracker.dismiss_prompt(),
            UiCommand::ClickReminder => self.tracker.click_reminder(),
            UiCommand::StartAll => self.tracker.start_all(),
            UiCommand::FinishJourney => self.tracker.request_finish(),
            UiCommand::SubmitRating(rating) => self.tracker.submit_rating(rating),
            UiCommand::AcceptPickupAdjust => self.pickup.accept(),
            UiCommand::DeclinePickupAdjust => self.pickup.decline(),
            UiCommand::MapClick(at) => {
                if !self.pickup.captures_clicks() {
                    return;
                }
                let mut effects = self.pickup.map_click(at);
                effects.push(Effect::Ui(UiEvent::MapUpdated(
                    self.map.set_candidate(Some(at)),
                )));
                effects
            }
            UiCommand::ConfirmPickup => self.pickup.confirm(),
            UiCommand::Shutdown => Vec::new(),
        };
        self.dispatch(effects);
    }

    fn complete(&mut self, completion: Completion) {
        let effects = match completion {
            Completion::Reported(Some(ack)) if !ack.is_empty() => {
                vec![Effect::Ui(UiEvent::Status(ack))]
            }
            Completion::Reported(_)
            | Completion::Polled(None)
            | Completion::Status(None)
            | Completion::PickupGeocoded(None) => Vec::new(),
            Completion::Polled(Some(live)) => {
                let mut effects = vec![Effect::Ui(UiEvent::MapUpdated(self.map.render(&live)))];
                effects.extend(self.tracker.observe(&live));
                effects.extend(self.pickup.observe(&live));
                effects
            }
            Completion::Status(Some(status)) => self.tracker.observe_status(&status),
            Completion::PickupGeocoded(Some(position)) => {
                vec![Effect::Ui(UiEvent::MapUpdated(self.map.set_pickup(position)))]
            }
            Completion::Started { passengers, result } => match result {
                Ok(message) => self.tracker.start_succeeded(&passengers, message),
                Err(e) => {
                    self.log_failure(&e, "start journey failed");
                    self.tracker
                        .start_failed(&passengers, e.alert_text(START_FAILED_ALERT))
                }
            },
            Completion::Finished(Ok(message)) => self.tracker.finish_succeeded(message),
            Completion::Finished(Err(e)) => {
                self.log_failure(&e, "finish journey failed");
                self.tracker.finish_failed(e.alert_text(FINISH_FAILED_ALERT))
            }
            Completion::Rated(Ok(receipt)) => self
                .tracker
                .rating_accepted(receipt.message, receipt.redirect_url),
            Completion::Rated(Err(e)) => {
                self.log_failure(&e, "rating failed");
                self.tracker.rating_failed(e.alert_text(RATING_FAILED_ALERT))
            }
            Completion::PickupUpdated(Ok(message)) => {
                let mut effects = self.pickup.succeeded(message);
                effects.push(Effect::Ui(UiEvent::MapUpdated(self.map.promote_candidate())));
                effects
            }
            Completion::PickupUpdated(Err(e)) => {
                self.log_failure(&e, "pickup update failed");
                let mut effects = self.pickup.failed(e.alert_text(PICKUP_FAILED_ALERT));
                effects.push(Effect::Ui(UiEvent::MapUpdated(self.map.set_candidate(None))));
                effects
            }
        };
        self.dispatch(effects);
    }

    fn log_failure(&self, error: &TrackingError, what: &str) {
        if error.is_rejection() {
            tracing::info!(error = %error, ride_id = self.ctx.ride_id, "{what}: refused by server");
        } else {
            tracing::warn!(error = %error, ride_id = self.ctx.ride_id, "{what}");
        }
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Ui(event) => self.emit(event),
                Effect::Send(outbound) => self.send(outbound),
            }
        }
    }

    fn emit(&self, event: UiEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("ui event receiver dropped");
        }
    }

    fn send(&mut self, outbound: Outbound) {
        let client = Arc::clone(&self.client);
        let ride = self.ride_ref();
        match outbound {
            Outbound::StartJourney { passengers } => {
                tracing::info!(ride_id = ride.ride_id, ?passengers, "starting journey");
                self.tasks.spawn(async move {
                    let result = client.start_journey(&ride).await;
                    Completion::Started { passengers, result }
                });
            }
            Outbound::FinishJourney => {
                tracing::info!(ride_id = ride.ride_id, "finishing journey");
                self.tasks
                    .spawn(async move { Completion::Finished(client.finish_journey(&ride).await) });
            }
            Outbound::SubmitRating(rating) => {
                let request = RatingRequest {
                    ride_id: ride.ride_id,
                    ride_date: ride.ride_date,
                    rating,
                };
                self.tasks
                    .spawn(async move { Completion::Rated(client.submit_rating(&request).await) });
            }
            Outbound::UpdatePickup(at) => {
                let update = PickupUpdate {
                    ride_id: ride.ride_id,
                    latitude: at.lat,
                    longitude: at.lon,
                };
                self.tasks.spawn(async move {
                    Completion::PickupUpdated(client.update_pickup_location(&update).await)
                });
            }
        }
    }

    fn spawn_pickup_lookup(&mut self) {
        let Some(geocoder) = self.geocoder.clone() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let ride_id = self.ctx.ride_id;
        self.tasks.spawn(async move {
            Completion::PickupGeocoded(lookup_pickup(&client, &geocoder, ride_id).await)
        });
    }

    fn ride_ref(&self) -> RideRef {
        RideRef {
            ride_id: self.ctx.ride_id,
            ride_date: self.ctx.ride_date,
        }
    }
}

/// Resolves the ride's pickup address to a map position.
async fn lookup_pickup(
    client: &TrackingClient,
    geocoder: &Geocoder,
    ride_id: i64,
) -> Option<Position> {
    let address = match client.pickup_address(ride_id).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            tracing::debug!(ride_id, "ride has no pickup address");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, ride_id, "failed to fetch pickup address");
            return None;
        }
    };

    match geocoder.search(&address).await {
        Ok(Some(position)) => Some(position),
        Ok(None) => {
            tracing::debug!(ride_id, address = %address, "pickup address not found by geocoder");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, ride_id, "pickup geocoding failed");
            None
        }
    }
}

/// Report fires immediately, the first poll after `poll_offset`, status
/// immediately. Late ticks are delayed rather than bunched.
fn schedule(timings: &SessionTimings) -> (Interval, Interval, Interval) {
    let mut report = time::interval(timings.report_interval);
    let mut poll = time::interval_at(Instant::now() + timings.poll_offset, timings.poll_interval);
    let mut status = time::interval(timings.status_interval);
    for timer in [&mut report, &mut poll, &mut status] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }
    (report, poll, status)
}
