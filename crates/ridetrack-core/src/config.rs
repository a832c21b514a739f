use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_interval_ms = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "interval must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let api_base_url = require("RIDETRACK_API_BASE_URL")?;
    validate_http_url("RIDETRACK_API_BASE_URL", &api_base_url)?;

    let env = parse_environment(&or_default("RIDETRACK_ENV", "development"))?;
    let log_level = or_default("RIDETRACK_LOG_LEVEL", "info");

    let geocoder_base_url = or_default(
        "RIDETRACK_GEOCODER_BASE_URL",
        "https://nominatim.openstreetmap.org",
    );
    validate_http_url("RIDETRACK_GEOCODER_BASE_URL", &geocoder_base_url)?;

    let request_timeout_secs = parse_u64("RIDETRACK_REQUEST_TIMEOUT_SECS", "15")?;
    let user_agent = or_default("RIDETRACK_USER_AGENT", "ridetrack/0.1 (pickup-tracking)");
    let session_cookie = lookup("RIDETRACK_SESSION_COOKIE")
        .ok()
        .filter(|v| !v.is_empty());

    let report_interval_ms = parse_interval_ms("RIDETRACK_REPORT_INTERVAL_MS", "10000")?;
    let poll_interval_ms = parse_interval_ms("RIDETRACK_POLL_INTERVAL_MS", "10000")?;
    // Zero is allowed for the offset.
    let poll_offset_ms = parse_u64("RIDETRACK_POLL_OFFSET_MS", "1500")?;
    let status_interval_ms = parse_interval_ms("RIDETRACK_STATUS_INTERVAL_MS", "5000")?;

    Ok(AppConfig {
        env,
        log_level,
        api_base_url,
        geocoder_base_url,
        request_timeout_secs,
        user_agent,
        session_cookie,
        report_interval_ms,
        poll_interval_ms,
        poll_offset_ms,
        status_interval_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RIDETRACK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn validate_http_url(var: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("'{value}' is not an http(s) URL"),
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
