//! Pass alert scheduling engine for skywatch.
//!
//! `skywatch-alerts` turns predicted passes of an orbiting object into
//! live, cancellable, deferred evaluation tasks. A caller registers
//! interest in visible passes over a location with a cloud-cover
//! tolerance and a time-of-day window; the engine schedules one alert
//! per qualifying pass, evaluated ten minutes before the pass rises,
//! and notifies only if the sky is clear enough at that moment.
//!
//! # Features
//!
//! - **At most one alert set per location**: registering again for a
//!   location cancels the previous set before the new one is installed
//! - **Time-of-day filtering**: day/night/any windows backed by an
//!   external sunrise/sunset collaborator, failing closed when the
//!   collaborator cannot answer
//! - **Just-in-time condition check**: each alert queries current
//!   cloud cover when it fires and suppresses itself above tolerance
//! - **Race-safe cancellation**: a replaced alert whose timer already
//!   elapsed still cannot deliver (check-before-act)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skywatch_alerts::{AlertRequest, AlertScheduler, Location, TimeOfDay};
//!
//! let scheduler = AlertScheduler::new(predictor, weather, sun, channel);
//!
//! let location = Location::new(47.6062, -122.3321, 56.0)?.with_name("Seattle");
//! let request = AlertRequest::new(location, 0.3, TimeOfDay::Night, "dev1")?;
//!
//! // Synchronous preview; the alerts themselves fire later.
//! let previews = scheduler.register_alerts(request).await?;
//! for preview in &previews {
//!     println!("{} trigger at {}", preview.rise_time_display(), preview.trigger_at);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channels;
pub mod collaborators;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod types;
pub mod window;

// Re-export main types at crate root
pub use channels::{LogChannel, NotificationChannel, PassNotification};
pub use collaborators::{PassPredictor, SunEvents, WeatherService};
pub use error::{AlertError, Result};
pub use registry::{AlertRegistry, ScheduledAlert};
pub use scheduler::{
    trigger_time, AlertScheduler, AlertSchedulerConfig, TRIGGER_LEAD_MINUTES,
};
pub use types::{
    AlertRequest, AlertState, Location, LocationKey, Pass, PreviewEntry, TimeOfDay,
};
