//! Collaborator contracts consumed by the scheduling core.
//!
//! Pass prediction, weather lookups, and sunrise/sunset computation
//! are external services; the core only depends on these object-safe
//! traits. Production implementations live in `skywatch-clients`.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Location, Pass};

/// Predicts upcoming passes of the tracked object over a location.
#[async_trait]
pub trait PassPredictor: Send + Sync + fmt::Debug {
    /// Returns up to `count` upcoming passes for the location.
    ///
    /// `force_visible` restricts the result to passes predicted to be
    /// visible from the ground, where the backing service supports it.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::PredictionUnavailable` if passes cannot be
    /// computed.
    async fn next_passes(
        &self,
        location: &Location,
        count: usize,
        force_visible: bool,
    ) -> Result<Vec<Pass>>;
}

/// Reports cloud cover for a location.
///
/// All cloud-cover values are fractions in [0, 1]: 0 is clear sky,
/// 1 is fully overcast.
#[async_trait]
pub trait WeatherService: Send + Sync + fmt::Debug {
    /// Returns the current cloud-cover fraction at the location.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::WeatherUnavailable` if conditions cannot
    /// be fetched.
    async fn current_cloud_cover(&self, location: &Location) -> Result<f64>;

    /// Returns the forecast cloud-cover fraction at the location for
    /// the given time.
    ///
    /// Implementations select the forecast entry whose timestamp is
    /// nearest `at`, breaking ties toward the earlier entry.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::WeatherUnavailable` if no forecast is
    /// available.
    async fn cloud_forecast(&self, location: &Location, at: DateTime<Utc>) -> Result<f64>;
}

/// Computes sunrise and sunset events for a location.
///
/// `previous_*` methods return the most recent event at or before the
/// reference time; `next_*` methods return the first event strictly
/// after it.
#[async_trait]
pub trait SunEvents: Send + Sync + fmt::Debug {
    /// The first sunrise strictly after `reference`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NoEventAtLatitude` if no such event exists
    /// (polar day or polar night).
    async fn next_rise(&self, location: &Location, reference: DateTime<Utc>)
        -> Result<DateTime<Utc>>;

    /// The first sunset strictly after `reference`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NoEventAtLatitude` if no such event exists.
    async fn next_set(&self, location: &Location, reference: DateTime<Utc>)
        -> Result<DateTime<Utc>>;

    /// The most recent sunrise at or before `reference`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NoEventAtLatitude` if no such event exists.
    async fn previous_rise(
        &self,
        location: &Location,
        reference: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    /// The most recent sunset at or before `reference`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NoEventAtLatitude` if no such event exists.
    async fn previous_set(
        &self,
        location: &Location,
        reference: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;
}
