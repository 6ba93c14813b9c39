//! Scheduled alert ownership and cancellation.
//!
//! The [`AlertRegistry`] owns every live [`ScheduledAlert`] keyed by
//! location, and enforces the replace-cancels-old-first rule: at most
//! one alert set is ever active per location.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::{AlertState, LocationKey, Pass};

/// A single deferred alert covering one predicted pass.
///
/// Created in `Pending` state at registration time. Cancellation is
/// best-effort and non-preemptive: an alert cancelled while still
/// `Pending` has its timer task aborted, while one that already began
/// `Firing` runs to completion but is prevented from delivering by the
/// cancelled flag (check-before-act).
#[derive(Debug)]
pub struct ScheduledAlert {
    pass: Pass,
    trigger_at: DateTime<Utc>,
    state: Mutex<AlertState>,
    cancelled: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledAlert {
    /// Creates a pending alert for a pass with its trigger timestamp.
    #[must_use]
    pub fn new(pass: Pass, trigger_at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            pass,
            trigger_at,
            state: Mutex::new(AlertState::Pending),
            cancelled: AtomicBool::new(false),
            task: Mutex::new(None),
        })
    }

    /// The pass this alert covers.
    #[must_use]
    pub const fn pass(&self) -> Pass {
        self.pass
    }

    /// When this alert is evaluated.
    #[must_use]
    pub const fn trigger_at(&self) -> DateTime<Utc> {
        self.trigger_at
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AlertState {
        *self.state.lock()
    }

    /// True once [`cancel`](Self::cancel) has been called, regardless
    /// of which state the alert was in at that moment.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Attaches the timer task driving this alert.
    ///
    /// An alert cancelled before its task was attached aborts the
    /// incoming handle instead of storing it; the abort in
    /// [`cancel`](Self::cancel) only reaches handles already attached.
    pub fn attach_task(&self, handle: JoinHandle<()>) {
        let mut task = self.task.lock();
        if self.is_cancelled() {
            handle.abort();
            return;
        }
        *task = Some(handle);
    }

    /// Attempts the `Pending -> Firing` transition.
    ///
    /// Returns false if the alert was cancelled (or already fired)
    /// before the timer elapsed, in which case the caller must not
    /// evaluate conditions or deliver anything.
    pub fn begin_firing(&self) -> bool {
        let mut state = self.state.lock();
        if *state == AlertState::Pending {
            *state = AlertState::Firing;
            true
        } else {
            false
        }
    }

    /// Cancels this alert.
    ///
    /// A still-pending alert transitions to `Cancelled` and its timer
    /// task is aborted. An alert already past `Pending` keeps its
    /// state (already-fired alerts are left untouched), but the
    /// cancelled flag still suppresses any delivery that has not
    /// happened yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut state = self.state.lock();
        if *state == AlertState::Pending {
            *state = AlertState::Cancelled;
            if let Some(handle) = self.task.lock().take() {
                handle.abort();
            }
            debug!(trigger_at = %self.trigger_at, "alert cancelled while pending");
        }
    }

    /// Completes the `Firing` phase: `Delivered` if the notification
    /// was pushed, `Suppressed` otherwise. No-op outside `Firing`.
    pub fn finish(&self, delivered: bool) {
        let mut state = self.state.lock();
        if *state == AlertState::Firing {
            *state = if delivered {
                AlertState::Delivered
            } else {
                AlertState::Suppressed
            };
        }
    }
}

/// Owns the mapping from location key to its scheduled alert set.
///
/// `replace` and `cancel_all` mutate a key's alert set inside one
/// short critical section; all collaborator I/O happens in the alerts'
/// own timer tasks, never under this lock.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    alerts: Mutex<HashMap<LocationKey, Vec<Arc<ScheduledAlert>>>>,
}

impl AlertRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every alert currently stored under `key`, then installs
    /// `new_alerts` as the key's alert set.
    ///
    /// Both halves happen inside a single critical section, so two
    /// `replace` calls for the same key can never interleave and no
    /// two alert sets coexist for one location.
    pub fn replace(&self, key: &LocationKey, new_alerts: Vec<Arc<ScheduledAlert>>) {
        let installed = new_alerts.len();
        let mut alerts = self.alerts.lock();
        let cancelled = match alerts.remove(key) {
            Some(old) => {
                for alert in &old {
                    alert.cancel();
                }
                old.len()
            }
            None => 0,
        };
        alerts.insert(key.clone(), new_alerts);
        drop(alerts);

        info!(
            key = %key,
            cancelled,
            installed,
            "replaced alert set"
        );
    }

    /// Cancels every alert for `key` with no replacement. No-op if the
    /// key has no alerts.
    pub fn cancel_all(&self, key: &LocationKey) {
        let removed = self.alerts.lock().remove(key);
        match removed {
            Some(old) => {
                for alert in &old {
                    alert.cancel();
                }
                info!(key = %key, cancelled = old.len(), "cancelled alert set");
            }
            None => {
                debug!(key = %key, "no alerts to cancel");
            }
        }
    }

    /// Returns the alerts currently stored under `key`.
    #[must_use]
    pub fn alerts(&self, key: &LocationKey) -> Vec<Arc<ScheduledAlert>> {
        self.alerts.lock().get(key).cloned().unwrap_or_default()
    }

    /// Returns how many alerts are stored under `key`.
    #[must_use]
    pub fn alert_count(&self, key: &LocationKey) -> usize {
        self.alerts.lock().get(key).map_or(0, Vec::len)
    }

    /// Returns how many locations currently hold an alert set.
    #[must_use]
    pub fn location_count(&self) -> usize {
        self.alerts.lock().len()
    }
}
