//! Status-mirror publisher.
//!
//! Uploads a snapshot of all resources to a remote target on status
//! transitions, on a fixed period, and on demand. Failures are retried with
//! backoff and never surface into the tick pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::store::{MonitoredResource, Store};

/// Period of the background publish while mirroring is enabled.
const PERIODIC_INTERVAL: Duration = Duration::from_secs(300);
/// Retries after the initial attempt; the n-th retry waits `RETRY_BASE * n`.
const MAX_RETRIES: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(2);

/// Mirror error types.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("mirror publishing is not enabled")]
    Disabled,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mirror target returned {0}")]
    Rejected(reqwest::StatusCode),
}

/// Publishes resource snapshots to the configured mirror URL.
#[derive(Clone)]
pub struct MirrorPublisher {
    store: Arc<Store>,
    client: reqwest::Client,
}

impl MirrorPublisher {
    pub fn new(store: Arc<Store>, client: reqwest::Client) -> Self {
        Self { store, client }
    }

    fn target_url(&self) -> Option<String> {
        let settings = self.store.settings();
        if settings.mirror_enabled && !settings.mirror_url.is_empty() {
            Some(settings.mirror_url)
        } else {
            None
        }
    }

    /// Fire-and-forget publish, used on status transitions. A disabled
    /// mirror is a silent no-op.
    pub fn trigger(&self) {
        let Some(url) = self.target_url() else {
            return;
        };
        let snapshot = self.store.get_resources();
        let client = self.client.clone();

        tokio::spawn(async move {
            if let Err(e) = publish_with_retry(&client, &url, &snapshot).await {
                tracing::error!("Mirror: publish failed after retries: {}", e);
            }
        });
    }

    /// On-demand publish; surfaces the final outcome to the caller.
    pub async fn publish_now(&self) -> Result<(), MirrorError> {
        let url = self.target_url().ok_or(MirrorError::Disabled)?;
        let snapshot = self.store.get_resources();
        publish_with_retry(&self.client, &url, &snapshot).await
    }

    /// Start the periodic background publish. Enablement is re-checked on
    /// every fire, so settings changes take effect without a restart.
    pub fn start_periodic(&self) {
        let publisher = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PERIODIC_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // skip the immediate first fire
            interval.tick().await;
            loop {
                interval.tick().await;
                match publisher.publish_now().await {
                    Ok(()) => {}
                    Err(MirrorError::Disabled) => {}
                    Err(e) => tracing::error!("Mirror: periodic publish failed: {}", e),
                }
            }
        });
    }
}

async fn publish_with_retry(
    client: &reqwest::Client,
    url: &str,
    snapshot: &[MonitoredResource],
) -> Result<(), MirrorError> {
    let payload = serde_json::json!({
        "generated_at": Utc::now(),
        "resources": snapshot,
    });

    let mut attempt = 0;
    loop {
        match publish_once(client, url, &payload).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    return Err(e);
                }
                attempt += 1;
                tracing::warn!(
                    "Mirror: publish attempt {} failed, retrying: {}",
                    attempt,
                    e
                );
                tokio::time::sleep(RETRY_BASE * attempt).await;
            }
        }
    }
}

async fn publish_once(
    client: &reqwest::Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<(), MirrorError> {
    let response = client.post(url).json(payload).send().await?;
    if !response.status().is_success() {
        return Err(MirrorError::Rejected(response.status()));
    }
    Ok(())
}
