//! Cloud-cover lookups over an OpenWeatherMap-style HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use skywatch_alerts::{AlertError, Location, Result, WeatherService};

/// Default base URL for the weather service.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Weather client reporting cloud cover as a fraction in [0, 1].
///
/// Current conditions come from the `weather` endpoint, forecasts from
/// the `forecast` endpoint's timestamped entry list.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    clouds: Clouds,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    clouds: Clouds,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

/// Selects the forecast entry whose timestamp is nearest `at`,
/// breaking ties toward the earlier entry.
fn nearest_entry(entries: &[ForecastEntry], at: DateTime<Utc>) -> Option<&ForecastEntry> {
    let target = at.timestamp();
    entries
        .iter()
        .min_by_key(|entry| ((entry.dt - target).abs(), entry.dt))
}

/// Converts a percentage cloud value to a fraction, clamped to [0, 1].
fn to_fraction(percent: f64) -> f64 {
    (percent / 100.0).clamp(0.0, 1.0)
}

impl OpenWeatherClient {
    /// Creates a client against the default service URL.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::WeatherUnavailable` if the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::WeatherUnavailable` if the HTTP client
    /// cannot be built.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("skywatch/0.1")
            .build()
            .map_err(|err| AlertError::WeatherUnavailable {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &Location,
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|err| AlertError::WeatherUnavailable {
                reason: err.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AlertError::WeatherUnavailable {
                reason: format!("service returned {}", resp.status()),
            });
        }

        resp.json()
            .await
            .map_err(|err| AlertError::WeatherUnavailable {
                reason: format!("malformed response: {err}"),
            })
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current_cloud_cover(&self, location: &Location) -> Result<f64> {
        let body: CurrentResponse = self.fetch_json("weather", location).await?;
        Ok(to_fraction(body.clouds.all))
    }

    async fn cloud_forecast(&self, location: &Location, at: DateTime<Utc>) -> Result<f64> {
        let body: ForecastResponse = self.fetch_json("forecast", location).await?;
        let entry =
            nearest_entry(&body.list, at).ok_or_else(|| AlertError::WeatherUnavailable {
                reason: "empty forecast list".to_string(),
            })?;
        Ok(to_fraction(entry.clouds.all))
    }
}
