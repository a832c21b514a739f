//! HTTP client for the marketplace's tracking endpoints.
//!
//! Wraps `reqwest` with endpoint-specific paths and typed bodies. Every
//! response body is inspected for an `"error"` string before the HTTP status
//! is considered, because the server reports business-rule rejections (such
//! as a duplicate rating) with a 200 status.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Response, Url};
use ridetrack_core::{AppConfig, RideStatus, Role};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::TrackingError;
use crate::types::{
    LiveLocations, LocationReport, MessageResponse, PickupLocationResponse, PickupUpdate,
    RatingReceipt, RatingRequest, RideRef, RideStatusResponse,
};

/// Client for the marketplace server's `/api/*` tracking endpoints.
///
/// Cheap to share behind an `Arc`; `reqwest::Client` pools connections
/// internally.
#[derive(Debug, Clone)]
pub struct TrackingClient {
    client: Client,
    base_url: Url,
}

impl TrackingClient {
    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// See [`TrackingClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, TrackingError> {
        Self::with_base_url(
            &config.api_base_url,
            config.request_timeout_secs,
            &config.user_agent,
            config.session_cookie.as_deref(),
        )
    }

    /// Creates a client pointed at `base_url` (a wiremock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidBaseUrl`] if `base_url` does not parse,
    /// [`TrackingError::InvalidCookie`] if the cookie is not a valid header
    /// value, or [`TrackingError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        session_cookie: Option<&str>,
    ) -> Result<Self, TrackingError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| TrackingError::InvalidCookie(e.to_string()))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: normalise_base_url(base_url)?,
        })
    }

    /// Posts the device position for `role` and returns the server's acknowledgement.
    ///
    /// # Errors
    ///
    /// Transport, status, decode, or rejection failures as [`TrackingError`].
    pub async fn report_location(
        &self,
        role: Role,
        report: &LocationReport,
    ) -> Result<String, TrackingError> {
        let path = format!("api/track_{}_location", role.as_str());
        let ack: MessageResponse = self.post_json(&path, report).await?;
        Ok(ack.message.unwrap_or_default())
    }

    /// Fetches the latest driver/passenger positions for the ride view.
    ///
    /// # Errors
    ///
    /// Transport, status, or decode failures as [`TrackingError`].
    pub async fn live_locations(
        &self,
        ride_id: i64,
        ride_date: Option<NaiveDate>,
    ) -> Result<LiveLocations, TrackingError> {
        self.get_json(&Self::live_locations_path(ride_id, ride_date))
            .await
    }

    /// Fetches the free-text pickup address of the ride.
    ///
    /// # Errors
    ///
    /// Transport, status, or decode failures as [`TrackingError`].
    pub async fn pickup_address(&self, ride_id: i64) -> Result<Option<String>, TrackingError> {
        let body: PickupLocationResponse = self
            .get_json(&format!("api/get_pickup_location/{ride_id}"))
            .await?;
        Ok(body.from_location.filter(|s| !s.trim().is_empty()))
    }

    /// # Errors
    ///
    /// Transport, status, decode, or rejection failures as [`TrackingError`].
    pub async fn start_journey(&self, ride: &RideRef) -> Result<Option<String>, TrackingError> {
        let ack: MessageResponse = self.post_json("api/start_journey", ride).await?;
        Ok(ack.message)
    }

    /// # Errors
    ///
    /// Transport, status, decode, or rejection failures as [`TrackingError`].
    pub async fn finish_journey(&self, ride: &RideRef) -> Result<Option<String>, TrackingError> {
        let ack: MessageResponse = self.post_json("api/finish_journey", ride).await?;
        Ok(ack.message)
    }

    /// # Errors
    ///
    /// Transport, status, decode, or rejection failures as [`TrackingError`].
    pub async fn ride_status(&self, ride: &RideRef) -> Result<RideStatus, TrackingError> {
        let body: RideStatusResponse = self.post_json("api/ride_status", ride).await?;
        Ok(RideStatus::parse(&body.status))
    }

    /// # Errors
    ///
    /// Transport, status, decode, or rejection failures as [`TrackingError`].
    pub async fn update_pickup_location(
        &self,
        update: &PickupUpdate,
    ) -> Result<Option<String>, TrackingError> {
        let ack: MessageResponse = self
            .post_json("api/update_passenger_pickup_location", update)
            .await?;
        Ok(ack.message)
    }

    /// Submits a passenger rating.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Rejected`] with the server's message when the
    /// ride was already rated (or the server refuses for any other business
    /// reason), otherwise transport/status/decode failures.
    pub async fn submit_rating(
        &self,
        request: &RatingRequest,
    ) -> Result<RatingReceipt, TrackingError> {
        self.post_json("api/submit_rating", request).await
    }

    fn live_locations_path(ride_id: i64, ride_date: Option<NaiveDate>) -> String {
        match ride_date {
            Some(date) => format!(
                "api/get_commute_live_locations/{ride_id}/{}",
                date.format("%Y-%m-%d")
            ),
            None => format!("api/get_live_locations/{ride_id}"),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, TrackingError> {
        self.base_url
            .join(path)
            .map_err(|e| TrackingError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TrackingError> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TrackingError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }
}

/// Ensures the base URL ends with exactly one slash so relative endpoint
/// paths are appended instead of replacing the last segment.
pub(crate) fn normalise_base_url(base_url: &str) -> Result<Url, TrackingError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| TrackingError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Reads a response body, surfacing `{"error": ...}` as a rejection before
/// looking at the status code.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TrackingError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;

    let value: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(TrackingError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Err(source) => {
            return Err(TrackingError::Deserialize {
                context: url,
                source,
            });
        }
    };

    if let Some(message) = rejection_message(&value) {
        return Err(TrackingError::Rejected(message));
    }

    if !status.is_success() {
        return Err(TrackingError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    serde_json::from_value(value).map_err(|source| TrackingError::Deserialize {
        context: url,
        source,
    })
}

fn rejection_message(body: &serde_json::Value) -> Option<String> {
    body.get("error")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
