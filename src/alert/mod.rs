//! Alert dispatch and notification channels.
//!
//! The dispatcher owns the transition table and the dedup latch decision;
//! channels are independent, and a failing channel is logged without
//! affecting the others or the tick pipeline.

mod email;
mod sms;

pub use email::*;
pub use sms::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::store::{MonitoredResource, ResourceStatus, Store};

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("channel not configured: {0}")]
    NotConfigured(&'static str),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected message: {0}")]
    Rejected(String),
    #[error("no notification channels enabled")]
    NoChannels,
}

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Down,
    Recovered,
    Test,
}

/// One outbound notification channel.
///
/// `send` must never panic past the dispatcher; a failure is terminal for
/// this attempt and carries no internal retry obligation.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(
        &self,
        kind: AlertKind,
        resource_name: &str,
        resource_url: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}

/// Decides whether a status transition warrants notifying, and through
/// which channels.
pub struct AlertDispatcher {
    store: Arc<Store>,
    client: reqwest::Client,
}

impl AlertDispatcher {
    pub fn new(store: Arc<Store>, client: reqwest::Client) -> Self {
        Self { store, client }
    }

    /// Channels currently enabled in the operator settings.
    fn enabled_channels(&self) -> Vec<Box<dyn Notifier>> {
        let settings = self.store.settings();
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if settings.sms_enabled {
            channels.push(Box::new(SmsNotifier::new(self.client.clone(), &settings)));
        }
        if settings.email_enabled {
            channels.push(Box::new(EmailNotifier::new(self.client.clone(), &settings)));
        }
        channels
    }

    /// Dispatch notifications for a status transition.
    ///
    /// Returns true when a down-alert was delivered on at least one channel,
    /// i.e. when the caller should close the `alert_sent` latch.
    pub async fn dispatch(&self, resource: &MonitoredResource, previous: ResourceStatus) -> bool {
        dispatch_to(&self.enabled_channels(), resource, previous).await
    }

    /// Send a test notification on every enabled channel.
    pub async fn send_test(&self, resource_name: &str) -> Result<(), NotifyError> {
        let channels = self.enabled_channels();
        if channels.is_empty() {
            return Err(NotifyError::NoChannels);
        }

        let message = format!("Test alert from PulseWatch ({})", resource_name);
        let mut last_err = None;
        let mut delivered = false;
        for channel in &channels {
            match channel.send(AlertKind::Test, resource_name, "", &message).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::warn!("AlertDispatcher: test on {} failed: {}", channel.name(), e);
                    last_err = Some(e);
                }
            }
        }

        if delivered {
            Ok(())
        } else {
            Err(last_err.unwrap_or(NotifyError::NoChannels))
        }
    }
}

/// Transition table and latch decision, separated from channel construction.
pub(crate) async fn dispatch_to(
    channels: &[Box<dyn Notifier>],
    resource: &MonitoredResource,
    previous: ResourceStatus,
) -> bool {
    let current = resource.status;

    if current == ResourceStatus::Down && previous != ResourceStatus::Down {
        // The latch stays closed across repeated down ticks; a streak gets
        // at most one alert.
        if resource.alert_sent {
            return false;
        }
        let message = format!(
            "ALERT: {} ({}) is DOWN after {} consecutive failed checks",
            resource.name, resource.url, resource.consecutive_failures
        );
        let mut delivered = false;
        for channel in channels {
            match channel
                .send(AlertKind::Down, &resource.name, &resource.url, &message)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "AlertDispatcher: down alert for {} sent via {}",
                        resource.name,
                        channel.name()
                    );
                    delivered = true;
                }
                Err(e) => {
                    tracing::warn!(
                        "AlertDispatcher: down alert for {} via {} failed: {}",
                        resource.name,
                        channel.name(),
                        e
                    );
                }
            }
        }
        return delivered;
    }

    if current == ResourceStatus::Up && previous == ResourceStatus::Down {
        // Recovery notifications are unconditional, independent of the latch.
        let message = format!(
            "RECOVERED: {} ({}) is back up",
            resource.name, resource.url
        );
        for channel in channels {
            if let Err(e) = channel
                .send(AlertKind::Recovered, &resource.name, &resource.url, &message)
                .await
            {
                tracing::warn!(
                    "AlertDispatcher: recovery notice for {} via {} failed: {}",
                    resource.name,
                    channel.name(),
                    e
                );
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ResourceKind;
    use std::sync::Mutex;

    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<AlertKind>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(
            &self,
            kind: AlertKind,
            _name: &str,
            _url: &str,
            _message: &str,
        ) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Rejected("boom".to_string()));
            }
            self.sent.lock().unwrap().push(kind);
            Ok(())
        }
    }

    fn channel(fail: bool) -> (Box<dyn Notifier>, Arc<Mutex<Vec<AlertKind>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(RecordingNotifier {
                sent: sent.clone(),
                fail,
            }),
            sent,
        )
    }

    fn down_resource() -> MonitoredResource {
        let mut r = MonitoredResource::new("api", "http://api.test", ResourceKind::Http, 60);
        r.status = ResourceStatus::Down;
        r.consecutive_failures = 3;
        r
    }

    #[tokio::test]
    async fn test_down_transition_alerts_and_latches() {
        let (ch, sent) = channel(false);
        let resource = down_resource();

        let latch = dispatch_to(&[ch], &resource, ResourceStatus::Warning).await;
        assert!(latch);
        assert_eq!(*sent.lock().unwrap(), vec![AlertKind::Down]);
    }

    #[tokio::test]
    async fn test_latched_down_is_silent() {
        let (ch, sent) = channel(false);
        let mut resource = down_resource();
        resource.alert_sent = true;

        let latch = dispatch_to(&[ch], &resource, ResourceStatus::Warning).await;
        assert!(!latch);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_down_to_down_is_silent() {
        let (ch, sent) = channel(false);
        let resource = down_resource();

        let latch = dispatch_to(&[ch], &resource, ResourceStatus::Down).await;
        assert!(!latch);
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recovery_notifies_without_latching() {
        let (ch, sent) = channel(false);
        let mut resource = down_resource();
        resource.status = ResourceStatus::Up;
        resource.consecutive_failures = 0;

        let latch = dispatch_to(&[ch], &resource, ResourceStatus::Down).await;
        assert!(!latch);
        assert_eq!(*sent.lock().unwrap(), vec![AlertKind::Recovered]);
    }

    #[tokio::test]
    async fn test_warning_transitions_are_silent() {
        let (ch, sent) = channel(false);
        let mut resource = down_resource();
        resource.status = ResourceStatus::Warning;
        resource.consecutive_failures = 1;

        assert!(!dispatch_to(&[ch], &resource, ResourceStatus::Up).await);
        assert!(sent.lock().unwrap().is_empty());

        // warning -> up with no prior down alert: also silent
        let (ch2, sent2) = channel(false);
        resource.status = ResourceStatus::Up;
        assert!(!dispatch_to(&[ch2], &resource, ResourceStatus::Warning).await);
        assert!(sent2.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let (bad, _) = channel(true);
        let (good, sent) = channel(false);
        let resource = down_resource();

        let latch = dispatch_to(&[bad, good], &resource, ResourceStatus::Unknown).await;
        // one successful delivery is enough to close the latch
        assert!(latch);
        assert_eq!(*sent.lock().unwrap(), vec![AlertKind::Down]);
    }

    #[tokio::test]
    async fn test_all_channels_failing_leaves_latch_open() {
        let (bad, _) = channel(true);
        let resource = down_resource();

        let latch = dispatch_to(&[bad], &resource, ResourceStatus::Warning).await;
        assert!(!latch);
    }
}
