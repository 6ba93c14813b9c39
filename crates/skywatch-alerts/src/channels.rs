//! Notification channels for alert delivery.
//!
//! This module provides the [`NotificationChannel`] trait and a
//! logging implementation for development and tests. Real transports
//! (push gateways) live in `skywatch-clients`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// The payload delivered when a pass alert fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassNotification {
    /// Human-readable location the pass is over.
    pub location: String,
    /// Cloud-cover fraction measured at firing time.
    #[serde(rename = "cloudcover")]
    pub cloud_cover: f64,
}

/// Trait for notification delivery channels.
///
/// Implement this trait to deliver pass alerts via different
/// protocols or services.
#[async_trait]
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel transport.
    fn name(&self) -> &str;

    /// Delivers a payload to the given devices on a named channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the payload cannot be
    /// delivered.
    async fn push(
        &self,
        channel: &str,
        device_ids: &[String],
        payload: &PassNotification,
    ) -> Result<()>;
}

/// A channel that logs notifications instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn push(
        &self,
        channel: &str,
        device_ids: &[String],
        payload: &PassNotification,
    ) -> Result<()> {
        info!(
            channel = %channel,
            devices = device_ids.len(),
            location = %payload.location,
            cloud_cover = payload.cloud_cover,
            "pass notification"
        );
        Ok(())
    }
}
