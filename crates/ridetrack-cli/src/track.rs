//! Interactive tracking session on a terminal.
//!
//! UI events are printed one per line; user actions are typed on stdin.

use std::io::BufRead;

use anyhow::{anyhow, bail};
use ridetrack_client::{
    Geocoder, MapView, PositionFeed, SessionTimings, SharedGeolocator, TrackingClient,
    TrackingSession, UiCommand, UiEvent,
};
use ridetrack_core::{AppConfig, Position, Rating, RideContext};
use tokio::sync::mpsc;

pub(crate) const HELP: &str = "commands: start | dismiss | remind | start-all | finish | rate <1-5> | \
adjust | skip-adjust | click <lat> <lon> | confirm | move <lat> <lon> | quit";

/// One parsed line of user input.
#[derive(Debug, PartialEq)]
pub(crate) enum Input {
    Command(UiCommand),
    /// New device position for the reporter.
    Move(Position),
    Quit,
}

/// Parses a stdin line. Blank lines yield `None`.
pub(crate) fn parse_line(line: &str) -> anyhow::Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let input = match (verb, args.as_slice()) {
        ("start", []) => Input::Command(UiCommand::ConfirmStart),
        ("dismiss", []) => Input::Command(UiCommand::DismissPrompt),
        ("remind", []) => Input::Command(UiCommand::ClickReminder),
        ("start-all", []) => Input::Command(UiCommand::StartAll),
        ("finish", []) => Input::Command(UiCommand::FinishJourney),
        ("rate", [stars]) => {
            let stars: i64 = stars
                .parse()
                .map_err(|_| anyhow!("rating must be a number, got '{stars}'"))?;
            Input::Command(UiCommand::SubmitRating(Rating::new(stars)?))
        }
        ("adjust", []) => Input::Command(UiCommand::AcceptPickupAdjust),
        ("skip-adjust", []) => Input::Command(UiCommand::DeclinePickupAdjust),
        ("click", [lat, lon]) => Input::Command(UiCommand::MapClick(parse_position(lat, lon)?)),
        ("confirm", []) => Input::Command(UiCommand::ConfirmPickup),
        ("move", [lat, lon]) => Input::Move(parse_position(lat, lon)?),
        ("quit" | "exit", []) => Input::Quit,
        _ => bail!("unrecognised input '{}'; {HELP}", line.trim()),
    };
    Ok(Some(input))
}

fn parse_position(lat: &str, lon: &str) -> anyhow::Result<Position> {
    let lat: f64 = lat
        .parse()
        .map_err(|_| anyhow!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| anyhow!("invalid longitude '{lon}'"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("coordinates out of range: {lat}, {lon}");
    }
    Ok(Position::new(lat, lon))
}

/// Human-readable line for a UI event.
pub(crate) fn describe(event: &UiEvent) -> String {
    match event {
        UiEvent::Status(text) => format!("status: {text}"),
        UiEvent::MapUpdated(view) => describe_map(view),
        UiEvent::NearbyPrompt { passenger: Some(name) } => {
            format!("{name} is nearby. Start the journey? [start / dismiss / start-all]")
        }
        UiEvent::NearbyPrompt { passenger: None } => {
            "Passenger is nearby. Start the journey? [start / dismiss]".to_owned()
        }
        UiEvent::PromptClosed => "prompt closed".to_owned(),
        UiEvent::Reminder { passengers } if passengers.len() > 1 => format!(
            "reminder: journey not started for {}. [start-all]",
            passengers.join(", ")
        ),
        UiEvent::Reminder { passengers } => match passengers.first() {
            Some(name) => format!("reminder: start the journey for {name}. [remind]"),
            None => "reminder: start the journey when ready. [remind]".to_owned(),
        },
        UiEvent::ReminderHidden => "reminder hidden".to_owned(),
        UiEvent::JourneyStarted { message } => format!("journey started: {message}"),
        UiEvent::JourneyFinished { message } => match message {
            Some(message) => format!("journey finished: {message}"),
            None => "journey finished".to_owned(),
        },
        UiEvent::RatingAvailable => "rate your ride: [rate <1-5>]".to_owned(),
        UiEvent::RatingSubmitted {
            message,
            redirect_url,
        } => match redirect_url {
            Some(url) => format!("{message} (redirect: {url})"),
            None => message.clone(),
        },
        UiEvent::AdjustPickupPrompt { distance_m } => format!(
            "You are {distance_m:.0} m from the driver. Adjust your pickup point? [adjust / skip-adjust]"
        ),
        UiEvent::AdjustPickupClosed => "pickup prompt closed".to_owned(),
        UiEvent::PickupSelecting => "choose the new pickup point: [click <lat> <lon>, then confirm]".to_owned(),
        UiEvent::PickupCandidate(p) => format!("new pickup candidate at {p}"),
        UiEvent::PickupUpdated { message } => format!("pickup updated: {message}"),
        UiEvent::Alert(text) => format!("ALERT: {text}"),
    }
}

fn describe_map(view: &MapView) -> String {
    let markers: Vec<String> = view
        .markers
        .iter()
        .map(|m| format!("{} @ {}", m.label, m.position))
        .collect();
    let mut line = format!("map z{} centre {}", view.zoom, view.center);
    if !markers.is_empty() {
        line.push_str(": ");
        line.push_str(&markers.join("; "));
    }
    if !view.clusters.is_empty() {
        line.push_str(&format!(" ({} clusters)", view.clusters.len()));
    }
    line
}

pub(crate) async fn run_track(
    config: &AppConfig,
    ctx: RideContext,
    position: Option<Position>,
) -> anyhow::Result<()> {
    let client = TrackingClient::from_config(config)?;
    let geocoder = Geocoder::from_config(config)?;
    let (geolocator, feed) = SharedGeolocator::new(position);

    let (session, mut events) =
        TrackingSession::new(ctx, client, geolocator, SessionTimings::from_config(config));
    let session = session.with_geocoder(geocoder);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", describe(&event));
        }
    });

    let (commands, rx) = mpsc::channel(16);
    // Blocking stdin reads run on a dedicated thread.
    std::thread::spawn(move || read_input(std::io::stdin().lock(), &commands, &feed));

    eprintln!("{HELP}");
    let state = session.run(rx, crate::shutdown_signal()).await;
    if let Err(e) = printer.await {
        tracing::debug!(error = %e, "event printer did not finish cleanly");
    }
    println!("session ended: journey {state}");
    Ok(())
}

/// Forwards typed input to the session until quit, end of input, or the
/// session stops listening.
pub(crate) fn read_input(
    input: impl BufRead,
    commands: &mpsc::Sender<UiCommand>,
    feed: &PositionFeed,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Input::Move(position))) => feed.set(position),
            Ok(Some(Input::Quit)) => {
                if let Err(e) = commands.blocking_send(UiCommand::Shutdown) {
                    tracing::debug!(error = %e, "session already stopped");
                }
                break;
            }
            Ok(Some(Input::Command(cmd))) => {
                if let Err(e) = commands.blocking_send(cmd) {
                    tracing::debug!(error = %e, "session stopped; ignoring further input");
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}
