use super::track::{describe, parse_line, read_input, Input};
use ridetrack_client::SharedGeolocator;
use tokio::sync::mpsc;
use super::*;
use ridetrack_client::UiCommand;
use ridetrack_client::UiEvent;
use ridetrack_core::{RideStatus, Role};

#[test]
fn parses_track_with_page_fields() {
    let cli = Cli::try_parse_from([
        "ridetrack",
        "--ride-id",
        "42",
        "--role",
        "driver",
        "--ride-date",
        "2025-12-01",
        "track",
    ])
    .expect("expected valid cli args");

    assert!(matches!(cli.command, Commands::Track));
    let ctx = cli.ride.context().expect("valid context");
    assert_eq!(ctx.ride_id, 42);
    assert_eq!(ctx.role, Role::Driver);
    assert!(ctx.is_commuting());
}

#[test]
fn global_args_may_follow_the_subcommand() {
    let cli = Cli::try_parse_from([
        "ridetrack",
        "track",
        "--ride-id",
        "7",
        "--role",
        "passenger",
        "--username",
        "alice",
        "--ride-status",
        "Done",
        "--lat",
        "51.5",
        "--lon",
        "-0.12",
    ])
    .expect("expected valid cli args");

    let ctx = cli.ride.context().expect("valid context");
    assert_eq!(ctx.username.as_deref(), Some("alice"));
    assert_eq!(ctx.initial_status, RideStatus::Done);
    assert_eq!(cli.ride.position(), Some(Position::new(51.5, -0.12)));
}

#[test]
fn missing_ride_id_fails_fast() {
    let cli = Cli::try_parse_from(["ridetrack", "--role", "driver", "track"])
        .expect("expected valid cli args");
    assert!(cli.ride.context().is_err());
}

#[test]
fn lat_requires_lon() {
    assert!(Cli::try_parse_from(["ridetrack", "--lat", "51.5", "track"]).is_err());
}

#[test]
fn parses_distance_with_negative_coordinates() {
    let cli = Cli::try_parse_from([
        "ridetrack", "distance", "51.5007", "-0.1246", "51.5008", "-0.1247",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Distance { lon1, .. } if (lon1 - -0.1246).abs() < f64::EPSILON
    ));
}

#[test]
fn parses_rate_command() {
    let cli = Cli::try_parse_from(["ridetrack", "--ride-id", "1", "--role", "passenger", "rate", "5"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Rate { rating: 5 }));
}

#[test]
fn stdin_commands_map_to_ui_commands() {
    let cases = [
        ("start", UiCommand::ConfirmStart),
        ("dismiss", UiCommand::DismissPrompt),
        ("remind", UiCommand::ClickReminder),
        ("start-all", UiCommand::StartAll),
        ("finish", UiCommand::FinishJourney),
        ("adjust", UiCommand::AcceptPickupAdjust),
        ("skip-adjust", UiCommand::DeclinePickupAdjust),
        ("confirm", UiCommand::ConfirmPickup),
    ];
    for (line, expected) in cases {
        assert_eq!(
            parse_line(line).expect("valid line"),
            Some(Input::Command(expected)),
            "line: {line}"
        );
    }
}

#[test]
fn stdin_commands_with_arguments() {
    assert_eq!(
        parse_line("rate 4").expect("valid"),
        Some(Input::Command(UiCommand::SubmitRating(
            Rating::new(4).expect("in range")
        )))
    );
    assert_eq!(
        parse_line("  click 51.51 -0.12 ").expect("valid"),
        Some(Input::Command(UiCommand::MapClick(Position::new(51.51, -0.12))))
    );
    assert_eq!(
        parse_line("move 51.5 -0.1").expect("valid"),
        Some(Input::Move(Position::new(51.5, -0.1)))
    );
    assert_eq!(parse_line("quit").expect("valid"), Some(Input::Quit));
    assert_eq!(parse_line("   ").expect("valid"), None);
}

#[test]
fn invalid_stdin_lines_are_errors() {
    assert!(parse_line("rate 6").is_err());
    assert!(parse_line("rate five").is_err());
    assert!(parse_line("click 91 0").is_err());
    assert!(parse_line("move 51.5").is_err());
    assert!(parse_line("start now").is_err());
    assert!(parse_line("teleport").is_err());
}

#[test]
fn describes_multi_reminder_as_start_all() {
    let line = describe(&UiEvent::Reminder {
        passengers: vec!["alice".to_owned(), "bob".to_owned()],
    });
    assert!(line.contains("alice, bob"));
    assert!(line.contains("start-all"));
}

#[test]
fn describes_alerts_verbatim() {
    assert_eq!(
        describe(&UiEvent::Alert("You have already rated this ride.".to_owned())),
        "ALERT: You have already rated this ride."
    );
}

#[test]
fn input_is_forwarded_until_quit() {
    let (commands, mut rx) = mpsc::channel(8);
    let (_geolocator, feed) = SharedGeolocator::new(None);
    read_input(
        "start\nbogus\nmove 51.5 -0.1\nquit\nfinish\n".as_bytes(),
        &commands,
        &feed,
    );

    assert_eq!(rx.try_recv().ok(), Some(UiCommand::ConfirmStart));
    assert_eq!(rx.try_recv().ok(), Some(UiCommand::Shutdown));
    assert!(rx.try_recv().is_err());
}

#[test]
fn input_stops_once_the_session_is_gone() {
    let (commands, rx) = mpsc::channel(8);
    drop(rx);
    let (_geolocator, feed) = SharedGeolocator::new(None);
    // Returns instead of blocking or panicking on the closed channel.
    read_input("start\nquit\n".as_bytes(), &commands, &feed);
    assert!(commands.is_closed());
}
