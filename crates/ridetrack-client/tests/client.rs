//! Integration tests for `TrackingClient` and `Geocoder` using wiremock HTTP mocks.

use chrono::NaiveDate;
use ridetrack_client::{
    Geocoder, LocationReport, PassengerLocations, PickupUpdate, RatingRequest, RideRef,
    TrackingClient, TrackingError,
};
use ridetrack_core::{Position, Rating, RideStatus, Role};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> TrackingClient {
    TrackingClient::with_base_url(base_url, 5, "ridetrack-test/0.1", None)
        .expect("client construction should not fail")
}

fn ride_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 1).expect("valid date")
}

#[tokio::test]
async fn report_location_posts_role_specific_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/track_driver_location"))
        .and(body_json(serde_json::json!({
            "ride_id": 12,
            "ride_date": "2025-12-01",
            "latitude": 51.5007,
            "longitude": -0.1246
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "Location updated" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let ack = client
        .report_location(
            Role::Driver,
            &LocationReport {
                ride_id: 12,
                ride_date: Some(ride_date()),
                latitude: 51.5007,
                longitude: -0.1246,
            },
        )
        .await
        .expect("report should succeed");

    assert_eq!(ack, "Location updated");
}

#[tokio::test]
async fn one_time_report_omits_ride_date() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/track_passenger_location"))
        .and(body_json(serde_json::json!({
            "ride_id": 3,
            "latitude": 51.52,
            "longitude": -0.13
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let ack = test_client(&server.uri())
        .report_location(
            Role::Passenger,
            &LocationReport {
                ride_id: 3,
                ride_date: None,
                latitude: 51.52,
                longitude: -0.13,
            },
        )
        .await
        .expect("report should succeed");
    assert_eq!(ack, "");
}

#[tokio::test]
async fn live_locations_decodes_single_passenger_pair() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_live_locations/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "driver": [51.5007, -0.1246],
            "passenger": [51.5008, -0.1247],
            "nearby": true
        })))
        .mount(&server)
        .await;

    let live = test_client(&server.uri())
        .live_locations(12, None)
        .await
        .expect("should parse live locations");

    assert_eq!(live.driver, Some(Position::new(51.5007, -0.1246)));
    assert_eq!(
        live.passenger,
        Some(PassengerLocations::Single(Position::new(51.5008, -0.1247)))
    );
    assert!(live.nearby);
}

#[tokio::test]
async fn commute_live_locations_decodes_passenger_map() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_commute_live_locations/12/2025-12-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "driver": [51.5007, -0.1246],
            "passenger": {
                "alice": [51.5008, -0.1247],
                "bob": [51.52, -0.13]
            },
            "nearby": null
        })))
        .mount(&server)
        .await;

    let live = test_client(&server.uri())
        .live_locations(12, Some(ride_date()))
        .await
        .expect("should parse commute live locations");

    let Some(PassengerLocations::PerPassenger(map)) = &live.passenger else {
        panic!("expected per-passenger map, got {:?}", live.passenger);
    };
    assert_eq!(map.len(), 2);
    assert_eq!(map["bob"], Position::new(51.52, -0.13));
    assert!(!live.nearby);
    assert_eq!(
        live.passenger_position(Some("alice")),
        Some(Position::new(51.5008, -0.1247))
    );
}

#[tokio::test]
async fn live_locations_tolerates_missing_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_live_locations/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let live = test_client(&server.uri())
        .live_locations(5, None)
        .await
        .expect("empty snapshot is valid");
    assert!(live.driver.is_none());
    assert!(live.passenger.is_none());
    assert!(!live.nearby);
}

#[tokio::test]
async fn server_error_surfaces_as_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_live_locations/5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .live_locations(5, None)
        .await
        .expect_err("500 should fail");
    assert!(
        matches!(err, TrackingError::UnexpectedStatus { status: 500, .. }),
        "got {err:?}"
    );
    assert!(!err.is_rejection());
}

#[tokio::test]
async fn malformed_body_surfaces_as_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_live_locations/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .live_locations(5, None)
        .await
        .expect_err("html should fail");
    assert!(matches!(err, TrackingError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn pickup_address_returns_free_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_pickup_location/12"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "from_location": "10 Downing St, London" })),
        )
        .mount(&server)
        .await;

    let address = test_client(&server.uri())
        .pickup_address(12)
        .await
        .expect("should parse pickup");
    assert_eq!(address.as_deref(), Some("10 Downing St, London"));
}

#[tokio::test]
async fn blank_pickup_address_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_pickup_location/12"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "from_location": "  " })),
        )
        .mount(&server)
        .await;

    let address = test_client(&server.uri())
        .pickup_address(12)
        .await
        .expect("should parse pickup");
    assert!(address.is_none());
}

#[tokio::test]
async fn start_and_finish_journey_post_ride_ref() {
    let server = MockServer::start().await;
    let expected = serde_json::json!({ "ride_id": 12, "ride_date": "2025-12-01" });

    Mock::given(method("POST"))
        .and(path("/api/start_journey"))
        .and(body_json(&expected))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "Journey started" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/finish_journey"))
        .and(body_json(&expected))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "Journey finished" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let ride = RideRef {
        ride_id: 12,
        ride_date: Some(ride_date()),
    };
    assert_eq!(
        client.start_journey(&ride).await.expect("start").as_deref(),
        Some("Journey started")
    );
    assert_eq!(
        client.finish_journey(&ride).await.expect("finish").as_deref(),
        Some("Journey finished")
    );
}

#[tokio::test]
async fn ride_status_maps_terminal_strings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ride_status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "Done" })),
        )
        .mount(&server)
        .await;

    let status = test_client(&server.uri())
        .ride_status(&RideRef {
            ride_id: 12,
            ride_date: None,
        })
        .await
        .expect("status");
    assert_eq!(status, RideStatus::Done);
}

#[tokio::test]
async fn update_pickup_location_posts_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/update_passenger_pickup_location"))
        .and(body_json(serde_json::json!({
            "ride_id": 12,
            "latitude": 51.511,
            "longitude": -0.121
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "Pickup location updated" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let message = test_client(&server.uri())
        .update_pickup_location(&PickupUpdate {
            ride_id: 12,
            latitude: 51.511,
            longitude: -0.121,
        })
        .await
        .expect("update");
    assert_eq!(message.as_deref(), Some("Pickup location updated"));
}

#[tokio::test]
async fn submit_rating_returns_receipt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/submit_rating"))
        .and(body_json(serde_json::json!({
            "ride_id": 12,
            "ride_date": "2025-12-01",
            "rating": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Rating submitted successfully",
            "redirect_url": "/dashboard"
        })))
        .mount(&server)
        .await;

    let receipt = test_client(&server.uri())
        .submit_rating(&RatingRequest {
            ride_id: 12,
            ride_date: Some(ride_date()),
            rating: Rating::new(5).expect("in range"),
        })
        .await
        .expect("rating");
    assert_eq!(receipt.redirect_url.as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn duplicate_rating_with_ok_status_is_a_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/submit_rating"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "error": "You have already rated this ride." })),
        )
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .submit_rating(&RatingRequest {
            ride_id: 12,
            ride_date: Some(ride_date()),
            rating: Rating::new(4).expect("in range"),
        })
        .await
        .expect_err("duplicate rating should be rejected");

    assert!(err.is_rejection());
    assert_eq!(err.alert_text("fallback"), "You have already rated this ride.");
}

#[tokio::test]
async fn error_body_on_client_error_status_is_still_a_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/start_journey"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({ "error": "Unauthorized" })),
        )
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .start_journey(&RideRef {
            ride_id: 12,
            ride_date: None,
        })
        .await
        .expect_err("403 should fail");
    assert!(matches!(&err, TrackingError::Rejected(m) if m == "Unauthorized"));
}

#[tokio::test]
async fn session_cookie_is_sent_on_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/get_live_locations/1"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        TrackingClient::with_base_url(&server.uri(), 5, "ridetrack-test/0.1", Some("session=abc123"))
            .expect("client");
    client.live_locations(1, None).await.expect("poll");
}

#[tokio::test]
async fn geocoder_returns_first_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "10 Downing St, London"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "lat": "51.5033635", "lon": "-0.1276248", "display_name": "10 Downing Street" },
            { "lat": "0", "lon": "0" }
        ])))
        .mount(&server)
        .await;

    let geocoder = Geocoder::with_base_url(&server.uri(), 5, "ridetrack-test/0.1").expect("geocoder");
    let position = geocoder
        .search("10 Downing St, London")
        .await
        .expect("search")
        .expect("a match");
    assert_eq!(position, Position::new(51.503_363_5, -0.127_624_8));
}

#[tokio::test]
async fn geocoder_without_matches_returns_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let geocoder = Geocoder::with_base_url(&server.uri(), 5, "ridetrack-test/0.1").expect("geocoder");
    assert!(geocoder.search("nowhere").await.expect("search").is_none());
}
