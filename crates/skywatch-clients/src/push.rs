//! Push-notification delivery through a cookie-session cloud gateway.
//!
//! The gateway requires a login that establishes a session cookie;
//! subsequent subscribe and notify calls reuse it. Session management
//! lives entirely in this collaborator, not in the scheduling core.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, info};

use skywatch_alerts::{AlertError, NotificationChannel, PassNotification, Result};

/// Push channel backed by a cloud notification gateway.
///
/// Keeps an in-memory roster of subscribed device ids per channel for
/// [`push_to_channel`](Self::push_to_channel); direct pushes to
/// explicit device ids go through the [`NotificationChannel`] impl.
#[derive(Debug)]
pub struct CloudPushChannel {
    client: Client,
    base_url: String,
    api_key: String,
    roster: Mutex<HashMap<String, Vec<String>>>,
}

impl CloudPushChannel {
    /// Creates a push channel against the gateway base URL.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the HTTP client cannot
    /// be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("skywatch/0.1")
            .cookie_store(true)
            .build()
            .map_err(|err| AlertError::DeliveryFailed {
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            roster: Mutex::new(HashMap::new()),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}.json?key={}", self.base_url, self.api_key)
    }

    /// Logs in to the gateway, establishing the session cookie used by
    /// all later calls.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the login request fails.
    pub async fn login(&self, user: &str, password: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("users/login"))
            .form(&[("login", user), ("password", password)])
            .send()
            .await
            .map_err(|err| AlertError::DeliveryFailed {
                reason: format!("login failed: {err}"),
            })?;

        if !resp.status().is_success() {
            return Err(AlertError::DeliveryFailed {
                reason: format!("login rejected with {}", resp.status()),
            });
        }

        info!(user, "push gateway session established");
        Ok(())
    }

    /// Subscribes a device to a channel, remembering it in the roster.
    /// Subscribing the same device twice is a no-op for the roster.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the subscribe request
    /// fails.
    pub async fn subscribe_device(
        &self,
        channel: &str,
        device_type: &str,
        device_id: &str,
    ) -> Result<()> {
        {
            let mut roster = self.roster.lock();
            let devices = roster.entry(channel.to_string()).or_default();
            if !devices.iter().any(|d| d == device_id) {
                devices.push(device_id.to_string());
            }
        }

        let resp = self
            .client
            .post(self.endpoint("push_notifications/subscribe"))
            .form(&[
                ("type", device_type),
                ("device_id", device_id),
                ("channel", channel),
            ])
            .send()
            .await
            .map_err(|err| AlertError::DeliveryFailed {
                reason: format!("subscribe failed: {err}"),
            })?;

        if !resp.status().is_success() {
            return Err(AlertError::DeliveryFailed {
                reason: format!("subscribe rejected with {}", resp.status()),
            });
        }

        debug!(channel, device_id, "device subscribed");
        Ok(())
    }

    /// Pushes a payload to every device subscribed to `channel`.
    /// No-op if the roster has no devices for it.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if delivery fails.
    pub async fn push_to_channel(&self, channel: &str, payload: &PassNotification) -> Result<()> {
        let devices = self
            .roster
            .lock()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        if devices.is_empty() {
            debug!(channel, "no subscribed devices, nothing to push");
            return Ok(());
        }
        self.push(channel, &devices, payload).await
    }

    /// Returns how many devices are subscribed to `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.roster.lock().get(channel).map_or(0, Vec::len)
    }
}

/// Builds the gateway notify form for a payload.
fn notify_form(
    channel: &str,
    device_ids: &[String],
    payload: &PassNotification,
) -> Result<[(String, String); 3]> {
    let message =
        serde_json::to_string(payload).map_err(|err| AlertError::DeliveryFailed {
            reason: format!("payload serialization failed: {err}"),
        })?;
    let envelope = serde_json::json!({
        "badge": 2,
        "sound": "default",
        "alert": message,
    });

    Ok([
        ("channel".to_string(), channel.to_string()),
        ("to_ids".to_string(), device_ids.join(",")),
        ("payload".to_string(), envelope.to_string()),
    ])
}

#[async_trait]
impl NotificationChannel for CloudPushChannel {
    fn name(&self) -> &str {
        "cloud-push"
    }

    async fn push(
        &self,
        channel: &str,
        device_ids: &[String],
        payload: &PassNotification,
    ) -> Result<()> {
        let form = notify_form(channel, device_ids, payload)?;
        let resp = self
            .client
            .post(self.endpoint("push_notification/notify"))
            .form(&form)
            .send()
            .await
            .map_err(|err| AlertError::DeliveryFailed {
                reason: err.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AlertError::DeliveryFailed {
                reason: format!("gateway returned {}", resp.status()),
            });
        }

        info!(
            channel,
            devices = device_ids.len(),
            location = %payload.location,
            "push notification sent"
        );
        Ok(())
    }
}
