//! Alert scheduling orchestration.
//!
//! The [`AlertScheduler`] turns predicted passes into live, deferred,
//! cancellable alert tasks: fetch passes, filter by time-of-day
//! window, install the alert set into the registry (replacing any
//! previous set for the location), spawn one timer task per alert,
//! and return an immediate per-pass preview to the caller.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channels::{NotificationChannel, PassNotification};
use crate::collaborators::{PassPredictor, SunEvents, WeatherService};
use crate::error::Result;
use crate::registry::{AlertRegistry, ScheduledAlert};
use crate::types::{AlertRequest, Location, PreviewEntry};
use crate::window::TimeWindowFilter;

/// How long before a pass's rise time its alert is evaluated.
pub const TRIGGER_LEAD_MINUTES: i64 = 10;

/// Returns the trigger timestamp for a pass rising at `rise_time`.
#[must_use]
pub fn trigger_time(rise_time: DateTime<Utc>) -> DateTime<Utc> {
    rise_time - Duration::minutes(TRIGGER_LEAD_MINUTES)
}

/// Configuration for the alert scheduler.
#[derive(Debug, Clone)]
pub struct AlertSchedulerConfig {
    /// Channel name notifications are pushed to.
    pub push_channel: String,
    /// Upper bound on each collaborator call made from a firing task.
    /// A timed-out call suppresses the alert instead of hanging it.
    pub collaborator_timeout: StdDuration,
}

impl Default for AlertSchedulerConfig {
    fn default() -> Self {
        Self {
            push_channel: "space".to_string(),
            collaborator_timeout: StdDuration::from_secs(30),
        }
    }
}

/// The values a firing task evaluates against, captured per pass at
/// registration time.
#[derive(Debug, Clone)]
struct FiringSnapshot {
    location: Location,
    acceptable_cloud_cover: f64,
    device_id: String,
}

/// Schedules deferred pass alerts and serves synchronous previews.
#[derive(Debug, Clone)]
pub struct AlertScheduler {
    config: AlertSchedulerConfig,
    registry: Arc<AlertRegistry>,
    predictor: Arc<dyn PassPredictor>,
    weather: Arc<dyn WeatherService>,
    window: TimeWindowFilter,
    channel: Arc<dyn NotificationChannel>,
}

impl AlertScheduler {
    /// Creates a scheduler over the given collaborators with default
    /// configuration.
    #[must_use]
    pub fn new(
        predictor: Arc<dyn PassPredictor>,
        weather: Arc<dyn WeatherService>,
        sun: Arc<dyn SunEvents>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self::with_config(
            AlertSchedulerConfig::default(),
            predictor,
            weather,
            sun,
            channel,
        )
    }

    /// Creates a scheduler with custom configuration.
    #[must_use]
    pub fn with_config(
        config: AlertSchedulerConfig,
        predictor: Arc<dyn PassPredictor>,
        weather: Arc<dyn WeatherService>,
        sun: Arc<dyn SunEvents>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(AlertRegistry::new()),
            predictor,
            weather,
            window: TimeWindowFilter::new(sun),
            channel,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AlertSchedulerConfig {
        &self.config
    }

    /// Returns the registry owning the scheduled alerts.
    #[must_use]
    pub fn registry(&self) -> Arc<AlertRegistry> {
        Arc::clone(&self.registry)
    }

    /// Registers deferred alerts for the upcoming passes over the
    /// request's location, replacing any alert set previously
    /// registered for it.
    ///
    /// Returns one preview entry per retained pass. The previews are
    /// synchronous; the alerts themselves fire later, each performing
    /// a just-in-time cloud-cover check before notifying.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::PredictionUnavailable` if the pass
    /// predictor fails. In that case no registry mutation occurs and
    /// any previously registered alert set stays active.
    pub async fn register_alerts(&self, request: AlertRequest) -> Result<Vec<PreviewEntry>> {
        let key = request.location.key();

        let passes = self
            .predictor
            .next_passes(&request.location, request.count, false)
            .await?;

        let mut retained = Vec::with_capacity(passes.len());
        for pass in passes {
            if self
                .window
                .is_in_window(&request.location, pass.rise_time, request.time_of_day)
                .await
            {
                retained.push(pass);
            } else {
                debug!(
                    key = %key,
                    rise_time = %pass.rise_time,
                    window = %request.time_of_day,
                    "pass outside requested window"
                );
            }
        }
        retained.sort_by_key(|pass| pass.rise_time);

        let scheduled: Vec<Arc<ScheduledAlert>> = retained
            .iter()
            .map(|pass| ScheduledAlert::new(*pass, trigger_time(pass.rise_time)))
            .collect();

        // Install before spawning so a past-due trigger can never run
        // ahead of the old set's cancellation.
        self.registry.replace(&key, scheduled.clone());

        for alert in &scheduled {
            // Each task gets its own snapshot of the request values;
            // nothing mutable is shared across passes.
            let snapshot = FiringSnapshot {
                location: request.location.clone(),
                acceptable_cloud_cover: request.acceptable_cloud_cover,
                device_id: request.device_id.clone(),
            };
            let handle = tokio::spawn(run_alert(
                Arc::clone(alert),
                snapshot,
                Arc::clone(&self.weather),
                Arc::clone(&self.channel),
                self.config.clone(),
            ));
            alert.attach_task(handle);
        }

        info!(
            key = %key,
            scheduled = scheduled.len(),
            window = %request.time_of_day,
            threshold = request.acceptable_cloud_cover,
            "registered pass alerts"
        );

        let mut previews = Vec::with_capacity(retained.len());
        for pass in &retained {
            let forecast = match self
                .weather
                .cloud_forecast(&request.location, pass.rise_time)
                .await
            {
                Ok(fraction) => Some(fraction),
                Err(err) => {
                    warn!(
                        key = %key,
                        rise_time = %pass.rise_time,
                        error = %err,
                        "forecast lookup failed, preview marked unknown"
                    );
                    None
                }
            };
            previews.push(PreviewEntry {
                location: request.location.clone(),
                rise_time: pass.rise_time,
                forecast_cloud_cover: forecast,
                trigger_at: trigger_time(pass.rise_time),
            });
        }

        Ok(previews)
    }

    /// Cancels all pending alerts for a location with no replacement.
    /// A location with no active alerts is a no-op.
    pub fn cancel_alerts(&self, location: &Location) {
        self.registry.cancel_all(&location.key());
    }
}

/// The deferred evaluation task for one scheduled alert.
///
/// Sleeps until the trigger timestamp (a past-due trigger fires
/// immediately), then runs the just-in-time check: current cloud
/// cover within tolerance and the alert not cancelled in the
/// meantime. Every failure path suppresses the alert; nothing here
/// can take down the scheduling facility.
async fn run_alert(
    alert: Arc<ScheduledAlert>,
    snapshot: FiringSnapshot,
    weather: Arc<dyn WeatherService>,
    channel: Arc<dyn NotificationChannel>,
    config: AlertSchedulerConfig,
) {
    let delay = (alert.trigger_at() - Utc::now())
        .to_std()
        .unwrap_or(StdDuration::ZERO);
    tokio::time::sleep(delay).await;

    if !alert.begin_firing() {
        debug!(trigger_at = %alert.trigger_at(), "alert no longer pending, not firing");
        return;
    }

    let location = &snapshot.location;
    let cover = match timeout(
        config.collaborator_timeout,
        weather.current_cloud_cover(location),
    )
    .await
    {
        Ok(Ok(fraction)) => fraction,
        Ok(Err(err)) => {
            warn!(
                location = %location.display_name(),
                error = %err,
                "weather check failed, suppressing alert"
            );
            alert.finish(false);
            return;
        }
        Err(_) => {
            warn!(
                location = %location.display_name(),
                "weather check timed out, suppressing alert"
            );
            alert.finish(false);
            return;
        }
    };

    if cover > snapshot.acceptable_cloud_cover {
        info!(
            location = %location.display_name(),
            cover,
            threshold = snapshot.acceptable_cloud_cover,
            "cloud cover above tolerance, suppressing alert"
        );
        alert.finish(false);
        return;
    }

    // Check-before-act: the alert set may have been replaced while
    // the weather query was in flight. Cancellation must prevent
    // delivery even when the timer already elapsed.
    if alert.is_cancelled() {
        debug!(
            location = %location.display_name(),
            "alert cancelled during firing, delivery suppressed"
        );
        alert.finish(false);
        return;
    }

    let payload = PassNotification {
        location: location.display_name(),
        cloud_cover: cover,
    };
    let push = channel.push(
        &config.push_channel,
        std::slice::from_ref(&snapshot.device_id),
        &payload,
    );
    match timeout(config.collaborator_timeout, push).await {
        Ok(Ok(())) => {
            info!(
                location = %location.display_name(),
                device = %snapshot.device_id,
                cover,
                "pass alert delivered"
            );
            alert.finish(true);
        }
        Ok(Err(err)) => {
            warn!(
                location = %location.display_name(),
                error = %err,
                "notification delivery failed, suppressing alert"
            );
            alert.finish(false);
        }
        Err(_) => {
            warn!(
                location = %location.display_name(),
                "notification delivery timed out, suppressing alert"
            );
            alert.finish(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use crate::types::{AlertState, Pass, TimeOfDay};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    struct StubPredictor {
        passes: Mutex<Vec<Pass>>,
        fail: AtomicBool,
    }

    impl StubPredictor {
        fn with_passes(passes: Vec<Pass>) -> Arc<Self> {
            Arc::new(Self {
                passes: Mutex::new(passes),
                fail: AtomicBool::new(false),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                passes: Mutex::new(Vec::new()),
                fail: AtomicBool::new(true),
            })
        }
    }

    #[async_trait]
    impl PassPredictor for StubPredictor {
        async fn next_passes(
            &self,
            _location: &Location,
            count: usize,
            _force_visible: bool,
        ) -> Result<Vec<Pass>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AlertError::PredictionUnavailable {
                    reason: "stub outage".to_string(),
                });
            }
            let passes = self.passes.lock();
            Ok(passes.iter().take(count).copied().collect())
        }
    }

    #[derive(Debug)]
    struct StubWeather {
        current: Mutex<f64>,
        forecast: Mutex<f64>,
        fail_current: AtomicBool,
        fail_forecast: AtomicBool,
        // When set, current_cloud_cover parks until released.
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl StubWeather {
        fn clear() -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(0.0),
                forecast: Mutex::new(0.1),
                fail_current: AtomicBool::new(false),
                fail_forecast: AtomicBool::new(false),
                gate: None,
            })
        }

        fn overcast() -> Arc<Self> {
            let stub = Self::clear();
            *stub.current.lock() = 0.9;
            stub
        }

        fn gated(gate: Arc<tokio::sync::Notify>) -> Arc<Self> {
            Arc::new(Self {
                current: Mutex::new(0.0),
                forecast: Mutex::new(0.1),
                fail_current: AtomicBool::new(false),
                fail_forecast: AtomicBool::new(false),
                gate: Some(gate),
            })
        }
    }

    #[async_trait]
    impl WeatherService for StubWeather {
        async fn current_cloud_cover(&self, _location: &Location) -> Result<f64> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_current.load(Ordering::SeqCst) {
                return Err(AlertError::WeatherUnavailable {
                    reason: "stub outage".to_string(),
                });
            }
            Ok(*self.current.lock())
        }

        async fn cloud_forecast(&self, _location: &Location, _at: DateTime<Utc>) -> Result<f64> {
            if self.fail_forecast.load(Ordering::SeqCst) {
                return Err(AlertError::WeatherUnavailable {
                    reason: "stub outage".to_string(),
                });
            }
            Ok(*self.forecast.lock())
        }
    }

    /// Sun that never produces events; only usable with `TimeOfDay::Any`
    /// (or to exercise fail-closed filtering).
    #[derive(Debug, Default)]
    struct NoSun;

    #[async_trait]
    impl SunEvents for NoSun {
        async fn next_rise(
            &self,
            location: &Location,
            _reference: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            Err(AlertError::NoEventAtLatitude {
                latitude: location.latitude,
            })
        }

        async fn next_set(
            &self,
            location: &Location,
            _reference: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            Err(AlertError::NoEventAtLatitude {
                latitude: location.latitude,
            })
        }

        async fn previous_rise(
            &self,
            location: &Location,
            _reference: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            Err(AlertError::NoEventAtLatitude {
                latitude: location.latitude,
            })
        }

        async fn previous_set(
            &self,
            location: &Location,
            _reference: DateTime<Utc>,
        ) -> Result<DateTime<Utc>> {
            Err(AlertError::NoEventAtLatitude {
                latitude: location.latitude,
            })
        }
    }

    #[derive(Debug, Default)]
    struct RecordingChannel {
        pushes: Mutex<Vec<(String, Vec<String>, PassNotification)>>,
        fail: AtomicBool,
    }

    impl RecordingChannel {
        fn push_count(&self) -> usize {
            self.pushes.lock().len()
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn push(
            &self,
            channel: &str,
            device_ids: &[String],
            payload: &PassNotification,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AlertError::DeliveryFailed {
                    reason: "stub outage".to_string(),
                });
            }
            self.pushes
                .lock()
                .push((channel.to_string(), device_ids.to_vec(), payload.clone()));
            Ok(())
        }
    }

    fn seattle() -> Location {
        Location::new(47.6062, -122.3321, 56.0)
            .unwrap()
            .with_name("Seattle")
    }

    fn pass_in(minutes: i64) -> Pass {
        Pass::new(Utc::now() + Duration::minutes(minutes), 600)
    }

    fn scheduler_over(
        predictor: Arc<StubPredictor>,
        weather: Arc<StubWeather>,
        channel: Arc<RecordingChannel>,
    ) -> AlertScheduler {
        AlertScheduler::new(predictor, weather, Arc::new(NoSun), channel)
    }

    async fn settle(alert: &Arc<ScheduledAlert>) {
        // Paused-clock runtimes auto-advance past the sleep; yield
        // until the firing task reaches a terminal state.
        for _ in 0..100 {
            if alert.state().is_terminal() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("alert never reached a terminal state: {}", alert.state());
    }

    mod trigger_tests {
        use super::*;
        use chrono::TimeZone;

        #[test]
        fn trigger_is_exactly_ten_minutes_before_rise() {
            let rise = Utc.with_ymd_and_hms(2026, 3, 15, 4, 30, 0).unwrap();
            assert_eq!(
                trigger_time(rise),
                Utc.with_ymd_and_hms(2026, 3, 15, 4, 20, 0).unwrap()
            );
        }

        #[test]
        fn default_config() {
            let config = AlertSchedulerConfig::default();
            assert_eq!(config.push_channel, "space");
            assert_eq!(config.collaborator_timeout, StdDuration::from_secs(30));
        }
    }

    mod registration_tests {
        use super::*;

        #[tokio::test]
        async fn previews_match_passes_for_any_window() {
            let predictor =
                StubPredictor::with_passes(vec![pass_in(30), pass_in(120), pass_in(300)]);
            let scheduler = scheduler_over(
                predictor,
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            let previews = scheduler.register_alerts(request).await.unwrap();

            assert_eq!(previews.len(), 3);
            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 3);
            for preview in &previews {
                assert_eq!(
                    preview.trigger_at,
                    preview.rise_time - Duration::minutes(TRIGGER_LEAD_MINUTES)
                );
                assert_eq!(preview.forecast_cloud_cover, Some(0.1));
            }
        }

        #[tokio::test]
        async fn previews_are_ordered_by_rise_time() {
            let predictor =
                StubPredictor::with_passes(vec![pass_in(300), pass_in(30), pass_in(120)]);
            let scheduler = scheduler_over(
                predictor,
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            let previews = scheduler.register_alerts(request).await.unwrap();

            assert!(previews.windows(2).all(|w| w[0].rise_time <= w[1].rise_time));
        }

        #[tokio::test]
        async fn count_bounds_requested_passes() {
            let predictor = StubPredictor::with_passes(vec![
                pass_in(30),
                pass_in(60),
                pass_in(90),
                pass_in(120),
            ]);
            let scheduler = scheduler_over(
                predictor,
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1")
                .unwrap()
                .with_count(2)
                .unwrap();
            let previews = scheduler.register_alerts(request).await.unwrap();

            assert_eq!(previews.len(), 2);
        }

        #[tokio::test]
        async fn day_window_with_no_sun_events_excludes_everything() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30), pass_in(60)]);
            let scheduler = scheduler_over(
                predictor,
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Day, "dev1").unwrap();
            let previews = scheduler.register_alerts(request).await.unwrap();

            assert!(previews.is_empty());
            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 0);
        }

        #[tokio::test]
        async fn predictor_failure_preserves_existing_alerts() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let weather = StubWeather::clear();
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(Arc::clone(&predictor), weather, channel);

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request.clone()).await.unwrap();
            let before = scheduler.registry().alerts(&seattle().key());
            assert_eq!(before.len(), 1);

            predictor.fail.store(true, Ordering::SeqCst);
            let result = scheduler.register_alerts(request).await;

            assert!(matches!(
                result,
                Err(AlertError::PredictionUnavailable { .. })
            ));
            // The old set is still installed and still pending.
            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 1);
            assert_eq!(before[0].state(), AlertState::Pending);
        }

        #[tokio::test]
        async fn forecast_failure_marks_preview_unknown_but_schedules() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let weather = StubWeather::clear();
            weather.fail_forecast.store(true, Ordering::SeqCst);
            let scheduler = scheduler_over(
                predictor,
                weather,
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            let previews = scheduler.register_alerts(request).await.unwrap();

            assert_eq!(previews.len(), 1);
            assert_eq!(previews[0].forecast_cloud_cover, None);
            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 1);
        }

        #[tokio::test]
        async fn reregistering_replaces_previous_set() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30), pass_in(60)]);
            let scheduler = scheduler_over(
                Arc::clone(&predictor),
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request.clone()).await.unwrap();
            let first = scheduler.registry().alerts(&seattle().key());

            *predictor.passes.lock() = vec![pass_in(90)];
            scheduler.register_alerts(request).await.unwrap();

            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 1);
            for alert in &first {
                assert!(alert.state().is_terminal());
            }
        }

        #[tokio::test]
        async fn cancel_alerts_empties_location() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let scheduler = scheduler_over(
                predictor,
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            scheduler.cancel_alerts(&seattle());

            assert_eq!(scheduler.registry().alert_count(&seattle().key()), 0);
        }

        #[tokio::test]
        async fn cancel_alerts_without_registration_is_noop() {
            let scheduler = scheduler_over(
                StubPredictor::failing(),
                StubWeather::clear(),
                Arc::new(RecordingChannel::default()),
            );
            scheduler.cancel_alerts(&seattle());
            assert_eq!(scheduler.registry().location_count(), 0);
        }
    }

    mod firing_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn clear_sky_delivers_notification() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(predictor, StubWeather::clear(), Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            tokio::time::advance(StdDuration::from_secs(25 * 60)).await;
            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Delivered);
            let pushes = channel.pushes.lock();
            assert_eq!(pushes.len(), 1);
            let (chan, devices, payload) = &pushes[0];
            assert_eq!(chan, "space");
            assert_eq!(devices, &vec!["dev1".to_string()]);
            assert_eq!(payload.location, "Seattle");
        }

        #[tokio::test(start_paused = true)]
        async fn overcast_sky_suppresses_notification() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let channel = Arc::new(RecordingChannel::default());
            let scheduler =
                scheduler_over(predictor, StubWeather::overcast(), Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            tokio::time::advance(StdDuration::from_secs(25 * 60)).await;
            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Suppressed);
            assert_eq!(channel.push_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn past_due_trigger_fires_immediately() {
            // Rise time already closer than the trigger lead; the
            // computed delay is in the past.
            let predictor = StubPredictor::with_passes(vec![pass_in(2)]);
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(predictor, StubWeather::clear(), Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Delivered);
            assert_eq!(channel.push_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn weather_outage_at_firing_suppresses() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let weather = StubWeather::clear();
            weather.fail_current.store(true, Ordering::SeqCst);
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(predictor, weather, Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            tokio::time::advance(StdDuration::from_secs(25 * 60)).await;
            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Suppressed);
            assert_eq!(channel.push_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn delivery_failure_suppresses_without_retry() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let channel = Arc::new(RecordingChannel::default());
            channel.fail.store(true, Ordering::SeqCst);
            let scheduler = scheduler_over(predictor, StubWeather::clear(), Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            tokio::time::advance(StdDuration::from_secs(25 * 60)).await;
            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Suppressed);
            assert_eq!(channel.push_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn cancellation_during_firing_prevents_delivery() {
            let gate = Arc::new(tokio::sync::Notify::new());
            let predictor = StubPredictor::with_passes(vec![pass_in(2)]);
            let weather = StubWeather::gated(Arc::clone(&gate));
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(predictor, weather, Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            // Let the past-due timer elapse and the task enter Firing,
            // where it parks inside the gated weather call.
            for _ in 0..50 {
                if alerts[0].state() == AlertState::Firing {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(alerts[0].state(), AlertState::Firing);

            // Replace the set while the callback is in flight, then
            // release the weather call.
            scheduler.cancel_alerts(&seattle());
            gate.notify_waiters();
            settle(&alerts[0]).await;

            assert_eq!(alerts[0].state(), AlertState::Suppressed);
            assert_eq!(channel.push_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn cancellation_before_trigger_never_fires() {
            let predictor = StubPredictor::with_passes(vec![pass_in(30)]);
            let channel = Arc::new(RecordingChannel::default());
            let scheduler = scheduler_over(predictor, StubWeather::clear(), Arc::clone(&channel));

            let request = AlertRequest::new(seattle(), 0.3, TimeOfDay::Any, "dev1").unwrap();
            scheduler.register_alerts(request).await.unwrap();
            let alerts = scheduler.registry().alerts(&seattle().key());

            scheduler.cancel_alerts(&seattle());
            assert_eq!(alerts[0].state(), AlertState::Cancelled);

            tokio::time::advance(StdDuration::from_secs(60 * 60)).await;
            for _ in 0..20 {
                tokio::task::yield_now().await;
            }

            assert_eq!(alerts[0].state(), AlertState::Cancelled);
            assert_eq!(channel.push_count(), 0);
        }
    }
}
