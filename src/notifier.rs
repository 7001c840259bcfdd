//! # Downstream Notifier
//!
//! Best-effort "collection updated" notifications sent after each
//! successful upsert. A failed notification is logged and never retried;
//! it never fails the ingestion cycle.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::error::{IngestError, Result};
use crate::telemetry::{Subsystem, TelemetryRecord};

/// Body posted to the notification endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload<'a> {
    pub collection: &'a str,
    pub data: &'a [TelemetryRecord],
}

/// Receiver of per-subsystem update notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that `records` were just written to the subsystem's collection.
    async fn notify(&self, subsystem: Subsystem, records: &[TelemetryRecord]) -> Result<()>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn notify(&self, subsystem: Subsystem, records: &[TelemetryRecord]) -> Result<()> {
        (**self).notify(subsystem, records).await
    }
}

/// Notifier posting JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    url: String,
}

impl HttpNotifier {
    /// Build a notifier for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_millis(config.timeout_ms))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, subsystem: Subsystem, records: &[TelemetryRecord]) -> Result<()> {
        let payload = NotificationPayload {
            collection: subsystem.collection(),
            data: records,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                IngestError::Notification(format!("{} update not delivered: {}", subsystem, e))
            })?;

        if !response.status().is_success() {
            return Err(IngestError::Notification(format!(
                "{} update rejected with status {}",
                subsystem,
                response.status()
            )));
        }

        debug!("Notified {} of {} {} records", self.url, records.len(), subsystem);
        Ok(())
    }
}

/// Notifier that drops every notification, used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _subsystem: Subsystem, _records: &[TelemetryRecord]) -> Result<()> {
        Ok(())
    }
}

/// Send a notification, logging instead of propagating any failure.
pub async fn notify_best_effort<N: Notifier + ?Sized>(
    notifier: &N,
    subsystem: Subsystem,
    records: &[TelemetryRecord],
) -> bool {
    match notifier.notify(subsystem, records).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Notification failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Notifier recording every call for assertions
    #[derive(Clone, Default)]
    pub struct RecordingNotifier {
        pub calls: Arc<Mutex<Vec<(Subsystem, usize)>>>,
        pub fail: Arc<Mutex<bool>>,
        pub delay: Arc<Mutex<Option<Duration>>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_calls(&self) -> Vec<(Subsystem, usize)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        /// Hold every delivery for `delay` before recording it.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, subsystem: Subsystem, records: &[TelemetryRecord]) -> Result<()> {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push((subsystem, records.len()));
            if *self.fail.lock().unwrap() {
                return Err(IngestError::Notification("Mock notification error".to_string()));
            }
            Ok(())
        }
    }
}
