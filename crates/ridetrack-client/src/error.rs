use thiserror::Error;

use crate::geolocation::GeolocationError;

#[derive(Debug, Error)]
pub enum TrackingError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server refused the request for a business reason (`{"error": "..."}`).
    /// The message is meant to be shown to the user verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid session cookie: {0}")]
    InvalidCookie(String),

    #[error("geolocation failed: {0}")]
    Geolocation(#[from] GeolocationError),
}

impl TrackingError {
    /// `true` for server-side business rejections, as opposed to transport failures.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, TrackingError::Rejected(_))
    }

    /// Text for a blocking alert: the server's own words for rejections,
    /// `fallback` for everything else.
    #[must_use]
    pub fn alert_text(&self, fallback: &str) -> String {
        match self {
            TrackingError::Rejected(message) => message.clone(),
            _ => fallback.to_owned(),
        }
    }
}
