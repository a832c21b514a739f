use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Origin of the marketplace server that exposes the `/api/*` endpoints.
    pub api_base_url: String,
    /// Nominatim-compatible forward geocoder used for the pickup marker.
    pub geocoder_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Sent verbatim as the `Cookie` header so requests ride the user's web session.
    pub session_cookie: Option<String>,
    pub report_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub poll_offset_ms: u64,
    pub status_interval_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn poll_offset(&self) -> Duration {
        Duration::from_millis(self.poll_offset_ms)
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("api_base_url", &self.api_base_url)
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[redacted]"),
            )
            .field("report_interval_ms", &self.report_interval_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_offset_ms", &self.poll_offset_ms)
            .field("status_interval_ms", &self.status_interval_ms)
            .finish()
    }
}
