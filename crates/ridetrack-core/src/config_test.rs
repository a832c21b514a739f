use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("RIDETRACK_API_BASE_URL", "http://localhost:5000");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "RIDETRACK_ENV"));
}

#[test]
fn build_app_config_fails_without_api_base_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "RIDETRACK_API_BASE_URL"),
        "expected MissingEnvVar(RIDETRACK_API_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_api_base_url_as_missing() {
    let mut map = HashMap::new();
    map.insert("RIDETRACK_API_BASE_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_rejects_non_http_base_url() {
    let mut map = HashMap::new();
    map.insert("RIDETRACK_API_BASE_URL", "ftp://example.com");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RIDETRACK_API_BASE_URL"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should parse");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.api_base_url, "http://localhost:5000");
    assert_eq!(cfg.geocoder_base_url, "https://nominatim.openstreetmap.org");
    assert_eq!(cfg.request_timeout_secs, 15);
    assert_eq!(cfg.user_agent, "ridetrack/0.1 (pickup-tracking)");
    assert!(cfg.session_cookie.is_none());
    assert_eq!(cfg.report_interval_ms, 10_000);
    assert_eq!(cfg.poll_interval_ms, 10_000);
    assert_eq!(cfg.poll_offset_ms, 1_500);
    assert_eq!(cfg.status_interval_ms, 5_000);
}

#[test]
fn build_app_config_reads_interval_overrides() {
    let mut map = full_env();
    map.insert("RIDETRACK_POLL_INTERVAL_MS", "2000");
    map.insert("RIDETRACK_POLL_OFFSET_MS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.poll_interval().as_millis(), 2000);
    assert_eq!(cfg.poll_offset().as_millis(), 0);
}

#[test]
fn build_app_config_rejects_zero_interval() {
    let mut map = full_env();
    map.insert("RIDETRACK_STATUS_INTERVAL_MS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RIDETRACK_STATUS_INTERVAL_MS"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = full_env();
    map.insert("RIDETRACK_REQUEST_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "RIDETRACK_REQUEST_TIMEOUT_SECS"),
        "got: {result:?}"
    );
}

#[test]
fn debug_output_redacts_session_cookie() {
    let mut map = full_env();
    map.insert("RIDETRACK_SESSION_COOKIE", "session=very-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("very-secret"), "leaked cookie: {rendered}");
    assert!(rendered.contains("[redacted]"));
}
