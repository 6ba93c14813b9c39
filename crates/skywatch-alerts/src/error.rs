//! Error types for the skywatch-alerts crate.

use thiserror::Error;

/// Errors that can occur while scheduling or firing pass alerts.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The pass predictor could not produce upcoming passes.
    #[error("pass prediction unavailable: {reason}")]
    PredictionUnavailable {
        /// Why prediction failed.
        reason: String,
    },

    /// The weather service could not report cloud cover.
    #[error("weather data unavailable: {reason}")]
    WeatherUnavailable {
        /// Why the weather lookup failed.
        reason: String,
    },

    /// A notification could not be delivered.
    #[error("notification delivery failed: {reason}")]
    DeliveryFailed {
        /// Why delivery failed.
        reason: String,
    },

    /// No sunrise/sunset event exists at this latitude for the
    /// reference time (polar day or polar night).
    #[error("no sun event at latitude {latitude}")]
    NoEventAtLatitude {
        /// The latitude in degrees.
        latitude: f64,
    },

    /// The alert request failed validation.
    #[error("invalid alert request: {reason}")]
    InvalidRequest {
        /// Why the request is invalid.
        reason: String,
    },
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
