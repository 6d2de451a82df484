//! Best-effort run event notification.
//!
//! Notification must never block or fail the pipeline: deliveries are
//! bounded by a timeout and every failure is logged and swallowed inside
//! the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coffer_core::{Error, Result, RunRecord};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded time for one webhook delivery
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Payload published for pipeline lifecycle events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run has started
    RunStarted {
        timestamp: DateTime<Utc>,
        source_path: String,
    },
    /// A run finished and its record was persisted
    RunCompleted { record: RunRecord },
    /// A run failed; the record carries the failure text
    RunFailed { record: RunRecord },
}

/// Capability interface for event publication
///
/// Implementations swallow their own failures; callers never observe them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publishes an event, best-effort
    async fn publish(&self, event: &RunEvent);
}

/// Posts events as JSON to a configured webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier delivering to the given URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coffer/", env!("CARGO_PKG_VERSION")))
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| Error::invalid_config(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, event: &RunEvent) {
        let result = self.client.post(&self.url).json(event).send().await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!("Webhook {} returned {}", self.url, response.status());
            }
            Ok(_) => debug!("Published run event to {}", self.url),
            Err(e) => warn!("Webhook delivery to {} failed: {}", self.url, e),
        }
    }
}

/// Notifier used when no webhook is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn publish(&self, _event: &RunEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coffer_core::ArchiveArtifact;
    use std::path::PathBuf;

    fn sample_record() -> RunRecord {
        let artifact = ArchiveArtifact {
            path: PathBuf::from("/backups/backup-app-20260115-093001.zip"),
            byte_size: 512,
            content_digest: "f".repeat(64),
        };
        let started = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 1).unwrap();
        RunRecord::success(started, "/data/app.sqlite", &artifact, "s3://b/k")
    }

    #[test]
    fn test_event_payload_shape() {
        let event = RunEvent::RunCompleted {
            record: sample_record(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "run_completed");
        assert_eq!(value["record"]["status"], "OK");
        assert_eq!(value["record"]["remote_id"], "s3://b/k");
    }

    #[test]
    fn test_started_event_payload_shape() {
        let event = RunEvent::RunStarted {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 1).unwrap(),
            source_path: "/data/app.sqlite".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "run_started");
        assert_eq!(value["source_path"], "/data/app.sqlite");
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_swallowed() {
        // Nothing listens on port 9; publish must still return normally
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        notifier
            .publish(&RunEvent::RunFailed {
                record: sample_record(),
            })
            .await;
    }

    #[tokio::test]
    async fn test_null_notifier_is_silent() {
        NullNotifier
            .publish(&RunEvent::RunStarted {
                timestamp: Utc::now(),
                source_path: String::new(),
            })
            .await;
    }
}
