//! HTTP collaborator clients for the skywatch alert engine.
//!
//! The scheduling core in `skywatch-alerts` talks to its outside world
//! through traits. This crate supplies the production implementations:
//!
//! - [`OpenNotifyPredictor`] — pass predictions from an open-notify
//!   style endpoint.
//! - [`OpenWeatherClient`] — current and forecast cloud cover from an
//!   OpenWeatherMap-style API.
//! - [`CloudPushChannel`] — push delivery through a cookie-session
//!   cloud notification gateway with a per-channel device roster.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod predictor;
pub mod push;
pub mod weather;

pub use predictor::OpenNotifyPredictor;
pub use push::CloudPushChannel;
pub use weather::OpenWeatherClient;
