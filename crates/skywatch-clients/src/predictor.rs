//! Pass prediction over the open-notify style HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use skywatch_alerts::{AlertError, Location, Pass, PassPredictor, Result};

/// Default base URL for the pass prediction service.
pub const DEFAULT_BASE_URL: &str = "http://api.open-notify.org";

/// Pass predictor backed by an open-notify style endpoint.
///
/// Queries `{base}/iss/?lat&lon&alt&n` and decodes the
/// `{"response": [{risetime, duration}]}` body.
#[derive(Debug, Clone)]
pub struct OpenNotifyPredictor {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PassesResponse {
    response: Vec<RawPass>,
}

#[derive(Debug, Deserialize)]
struct RawPass {
    risetime: i64,
    duration: u32,
}

impl OpenNotifyPredictor {
    /// Creates a predictor against the default service URL.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::PredictionUnavailable` if the HTTP client
    /// cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a predictor against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::PredictionUnavailable` if the HTTP client
    /// cannot be built.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("skywatch/0.1")
            .build()
            .map_err(|err| AlertError::PredictionUnavailable {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PassPredictor for OpenNotifyPredictor {
    async fn next_passes(
        &self,
        location: &Location,
        count: usize,
        force_visible: bool,
    ) -> Result<Vec<Pass>> {
        if force_visible {
            // The upstream service only predicts above-horizon passes;
            // it has no visibility filter to switch on.
            debug!("visible-only filtering not supported upstream, returning all passes");
        }

        let url = format!("{}/iss/", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("alt", format!("{}", location.elevation_m as i64)),
                ("n", count.to_string()),
            ])
            .send()
            .await
            .map_err(|err| AlertError::PredictionUnavailable {
                reason: err.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AlertError::PredictionUnavailable {
                reason: format!("service returned {}", resp.status()),
            });
        }

        let body: PassesResponse =
            resp.json()
                .await
                .map_err(|err| AlertError::PredictionUnavailable {
                    reason: format!("malformed response: {err}"),
                })?;

        body.response
            .into_iter()
            .map(|raw| {
                let rise_time = DateTime::from_timestamp(raw.risetime, 0).ok_or_else(|| {
                    AlertError::PredictionUnavailable {
                        reason: format!("invalid rise timestamp {}", raw.risetime),
                    }
                })?;
                Ok(Pass::new(rise_time, raw.duration))
            })
            .collect()
    }
}
