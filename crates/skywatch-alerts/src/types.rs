//! Core types for the pass alert engine.
//!
//! This module provides the fundamental types used throughout the crate:
//! - [`Location`]: an observer location with its canonical [`LocationKey`]
//! - [`Pass`]: a predicted pass of the tracked object over a location
//! - [`TimeOfDay`]: the day/night/any window preference
//! - [`AlertRequest`]: a validated request to register pass alerts
//! - [`AlertState`]: the lifecycle state of a scheduled alert
//! - [`PreviewEntry`]: the synchronous per-pass preview returned to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// An observer location.
///
/// The optional name is display-only; identity is the coordinate pair
/// (see [`Location::key`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Display name (e.g. a city name), if known.
    pub name: Option<String>,
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
    /// Elevation above sea level in meters.
    pub elevation_m: f64,
}

impl Location {
    /// Creates a location from coordinates.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRequest` if the latitude is outside
    /// [-90, 90] or the longitude is outside [-180, 180].
    pub fn new(latitude: f64, longitude: f64, elevation_m: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AlertError::InvalidRequest {
                reason: format!("latitude {latitude} outside [-90, 90]"),
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AlertError::InvalidRequest {
                reason: format!("longitude {longitude} outside [-180, 180]"),
            });
        }

        Ok(Self {
            name: None,
            latitude,
            longitude,
            elevation_m,
        })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the canonical registry key for this location.
    ///
    /// The key is derived from the coordinate pair rounded to 1e-4
    /// degrees (about 11 m), so a named request and a coordinate
    /// request for the same place address the same alert set.
    #[must_use]
    pub fn key(&self) -> LocationKey {
        LocationKey(format!("{:.4},{:.4}", self.latitude, self.longitude))
    }

    /// Returns a human-readable name: the display name if set,
    /// otherwise the coordinate pair.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{:.4},{:.4}", self.latitude, self.longitude))
    }
}

/// Canonical registry key for a location, derived from its coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey(String);

impl LocationKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A predicted pass of the tracked object over a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    /// When the object rises above the horizon (UTC).
    pub rise_time: DateTime<Utc>,
    /// How long the pass lasts, in seconds.
    pub duration_secs: u32,
}

impl Pass {
    /// Creates a pass.
    #[must_use]
    pub const fn new(rise_time: DateTime<Utc>, duration_secs: u32) -> Self {
        Self {
            rise_time,
            duration_secs,
        }
    }
}

/// Time-of-day preference for pass alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// Only passes between sunrise and sunset.
    Day,
    /// Only passes between sunset and sunrise.
    Night,
    /// Any pass, regardless of daylight.
    #[default]
    Any,
}

impl TimeOfDay {
    /// Returns the preference as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
            Self::Any => "any",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated request to register pass alerts for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    /// The observer location.
    pub location: Location,
    /// Maximum acceptable cloud-cover fraction in [0, 1] at firing time.
    pub acceptable_cloud_cover: f64,
    /// Time-of-day window preference.
    pub time_of_day: TimeOfDay,
    /// Device identifier that receives notifications.
    pub device_id: String,
    /// Maximum number of upcoming passes to consider.
    pub count: usize,
}

impl AlertRequest {
    /// Default number of upcoming passes to consider.
    pub const DEFAULT_PASS_COUNT: usize = 10;

    /// Creates a request with the default pass count.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRequest` if the cloud-cover
    /// threshold is outside [0, 1] or the device id is empty.
    pub fn new(
        location: Location,
        acceptable_cloud_cover: f64,
        time_of_day: TimeOfDay,
        device_id: impl Into<String>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&acceptable_cloud_cover) {
            return Err(AlertError::InvalidRequest {
                reason: format!("cloud cover threshold {acceptable_cloud_cover} outside [0, 1]"),
            });
        }

        let device_id = device_id.into();
        if device_id.is_empty() {
            return Err(AlertError::InvalidRequest {
                reason: "device id cannot be empty".to_string(),
            });
        }

        Ok(Self {
            location,
            acceptable_cloud_cover,
            time_of_day,
            device_id,
            count: Self::DEFAULT_PASS_COUNT,
        })
    }

    /// Sets the number of passes to consider.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRequest` if the count is zero.
    pub fn with_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(AlertError::InvalidRequest {
                reason: "pass count must be at least 1".to_string(),
            });
        }
        self.count = count;
        Ok(self)
    }
}

/// The lifecycle state of a scheduled alert.
///
/// Transitions: `Pending -> {Cancelled, Firing}` and
/// `Firing -> {Delivered, Suppressed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Waiting for the trigger timestamp.
    Pending,
    /// Cancelled before the trigger elapsed.
    Cancelled,
    /// Trigger elapsed; the just-in-time condition check is running.
    Firing,
    /// Conditions were met and the notification was pushed.
    Delivered,
    /// Conditions were not met, or the alert was cancelled or failed
    /// during firing; no notification was pushed.
    Suppressed,
}

impl AlertState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Firing => "firing",
            Self::Delivered => "delivered",
            Self::Suppressed => "suppressed",
        }
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Delivered | Self::Suppressed)
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-pass preview returned synchronously from alert registration.
///
/// Not persisted; the forecast is `None` when the weather service
/// could not provide one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewEntry {
    /// The observer location.
    pub location: Location,
    /// When the pass rises (UTC).
    pub rise_time: DateTime<Utc>,
    /// Forecast cloud-cover fraction at rise time, if available.
    pub forecast_cloud_cover: Option<f64>,
    /// When the alert will be evaluated.
    pub trigger_at: DateTime<Utc>,
}

impl PreviewEntry {
    /// Returns the pass rise time in a human-readable form.
    #[must_use]
    pub fn rise_time_display(&self) -> String {
        self.rise_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}
