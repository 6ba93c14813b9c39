//! Time-of-day window filtering for predicted passes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::collaborators::SunEvents;
use crate::error::Result;
use crate::types::{Location, TimeOfDay};

/// Decides whether a timestamp falls inside a requested time-of-day
/// window at a location.
///
/// Sunrise/sunset computation is delegated to a [`SunEvents`]
/// collaborator; this filter only applies the interval test. When the
/// collaborator cannot produce an event (polar locations), the filter
/// fails closed and excludes the pass.
#[derive(Debug, Clone)]
pub struct TimeWindowFilter {
    sun: Arc<dyn SunEvents>,
}

impl TimeWindowFilter {
    /// Creates a filter backed by the given ephemeris collaborator.
    #[must_use]
    pub fn new(sun: Arc<dyn SunEvents>) -> Self {
        Self { sun }
    }

    /// Returns true if `at` falls inside the requested window at the
    /// location.
    ///
    /// `TimeOfDay::Any` always matches. The day window runs from the
    /// most recent sunrise through the next sunset, inclusive of the
    /// sunset instant; the night window is its complement, which
    /// covers nights spanning midnight with no extra casing.
    pub async fn is_in_window(
        &self,
        location: &Location,
        at: DateTime<Utc>,
        preference: TimeOfDay,
    ) -> bool {
        if preference == TimeOfDay::Any {
            return true;
        }

        match self.sun_is_up(location, at).await {
            Ok(up) => match preference {
                TimeOfDay::Day => up,
                TimeOfDay::Night => !up,
                TimeOfDay::Any => true,
            },
            Err(err) => {
                // Fail closed: an unanswerable window test excludes
                // the pass rather than crashing or including it.
                warn!(
                    location = %location.display_name(),
                    error = %err,
                    "sun event lookup failed, excluding pass"
                );
                false
            }
        }
    }

    async fn sun_is_up(&self, location: &Location, at: DateTime<Utc>) -> Result<bool> {
        let last_rise = self.sun.previous_rise(location, at).await?;
        let last_set = self.sun.previous_set(location, at).await?;
        // The sunset instant itself still counts as day.
        Ok(last_rise > last_set || last_set == at)
    }
}
