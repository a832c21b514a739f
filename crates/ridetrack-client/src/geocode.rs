//! Forward geocoding of the ride's pickup address.
//!
//! Talks to a Nominatim-compatible `/search` endpoint and keeps only the
//! first match, which is what the map uses for the pickup marker.

use std::time::Duration;

use reqwest::{Client, Url};
use ridetrack_core::{AppConfig, Position};

use crate::client::{decode, normalise_base_url};
use crate::error::TrackingError;
use crate::types::GeocodeMatch;

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: Url,
}

impl Geocoder {
    /// # Errors
    ///
    /// See [`Geocoder::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, TrackingError> {
        Self::with_base_url(
            &config.geocoder_base_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// # Errors
    ///
    /// Returns [`TrackingError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`TrackingError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, TrackingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: normalise_base_url(base_url)?,
        })
    }

    /// Resolves `address` to its best match, or `None` when nothing matched.
    ///
    /// # Errors
    ///
    /// Transport, status, or decode failures as [`TrackingError`].
    pub async fn search(&self, address: &str) -> Result<Option<Position>, TrackingError> {
        let url = self.search_url(address)?;
        let response = self.client.get(url).send().await?;
        let matches: Vec<GeocodeMatch> = decode(response).await?;
        Ok(matches.first().map(|m| Position::new(m.lat, m.lon)))
    }

    fn search_url(&self, address: &str) -> Result<Url, TrackingError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| TrackingError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "json");
        Ok(url)
    }
}
