//! Resource and settings model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of past statuses kept per resource.
pub const HISTORY_LIMIT: usize = 15;

/// Probe protocol for a monitored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Http,
    Https,
    Ping,
}

/// Health status of a monitored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Unknown,
    Up,
    Warning,
    Down,
}

/// A monitored resource and its accumulated monitoring state.
///
/// Identity fields (`id`, `name`, `url`, `kind`, `interval_seconds`) are
/// mutated only through CRUD; everything else is owned by the check cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredResource {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub interval_seconds: u64,
    #[serde(default)]
    pub stopped: bool,
    pub status: ResourceStatus,
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Dedup latch: true while a delivered down-alert has not been
    /// followed by a recovery.
    #[serde(default)]
    pub alert_sent: bool,
    #[serde(default)]
    pub last_check_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_response_time_ms: u64,
    #[serde(default)]
    pub total_checks: u64,
    #[serde(default)]
    pub successful_checks: u64,
    /// Rounded uptime percentage, refreshed on every check; 100 before
    /// the first check.
    #[serde(default = "default_uptime")]
    pub uptime_pct: u8,
    /// Last `HISTORY_LIMIT` statuses, oldest first.
    #[serde(default)]
    pub history: Vec<ResourceStatus>,
    pub created_at: DateTime<Utc>,
}

fn default_uptime() -> u8 {
    100
}

impl MonitoredResource {
    /// Create a new resource with zeroed monitoring state.
    pub fn new(name: &str, url: &str, kind: ResourceKind, interval_seconds: u64) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            kind,
            interval_seconds,
            stopped: false,
            status: ResourceStatus::Unknown,
            consecutive_failures: 0,
            alert_sent: false,
            last_check_at: None,
            last_response_time_ms: 0,
            total_checks: 0,
            successful_checks: 0,
            uptime_pct: 100,
            history: Vec::new(),
            created_at: now,
        }
    }

    /// Refresh the stored uptime percentage from the check counters.
    pub fn refresh_uptime(&mut self) {
        self.uptime_pct = if self.total_checks == 0 {
            100
        } else {
            ((self.successful_checks as f64 / self.total_checks as f64) * 100.0).round() as u8
        };
    }

    /// Append a status to the history, evicting the oldest past the cap.
    pub fn push_history(&mut self, status: ResourceStatus) {
        self.history.push(status);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

/// Operator-configured notification and mirror settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifySettings {
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default)]
    pub twilio_account_sid: String,
    #[serde(default)]
    pub twilio_auth_token: String,
    #[serde(default)]
    pub twilio_from: String,
    #[serde(default)]
    pub twilio_to: String,
    #[serde(default)]
    pub email_enabled: bool,
    /// Base URL of the HTTP mail gateway, e.g. "https://api.mailgun.net".
    #[serde(default)]
    pub mail_api_base: String,
    #[serde(default)]
    pub mail_api_key: String,
    #[serde(default)]
    pub mail_domain: String,
    #[serde(default)]
    pub mail_from: String,
    #[serde(default)]
    pub mail_to: String,
    #[serde(default)]
    pub mirror_enabled: bool,
    #[serde(default)]
    pub mirror_url: String,
}

/// The subset of [`NotifySettings`] safe to return to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct SafeSettings {
    pub sms_enabled: bool,
    pub email_enabled: bool,
    pub mirror_enabled: bool,
}

impl NotifySettings {
    pub fn safe(&self) -> SafeSettings {
        SafeSettings {
            sms_enabled: self.sms_enabled,
            email_enabled: self.email_enabled,
            mirror_enabled: self.mirror_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_pct_no_checks() {
        let mut r = MonitoredResource::new("a", "http://a", ResourceKind::Http, 60);
        assert_eq!(r.uptime_pct, 100);
        r.refresh_uptime();
        assert_eq!(r.uptime_pct, 100);
    }

    #[test]
    fn test_uptime_pct_rounds() {
        let mut r = MonitoredResource::new("a", "http://a", ResourceKind::Http, 60);
        r.total_checks = 3;
        r.successful_checks = 2;
        r.refresh_uptime();
        // 66.66.. rounds to 67
        assert_eq!(r.uptime_pct, 67);

        r.total_checks = 8;
        r.successful_checks = 1;
        r.refresh_uptime();
        // 12.5 rounds to 13 (round half away from zero)
        assert_eq!(r.uptime_pct, 13);
    }

    #[test]
    fn test_uptime_pct_serialized() {
        let mut r = MonitoredResource::new("web", "http://web", ResourceKind::Http, 60);
        r.total_checks = 4;
        r.successful_checks = 1;
        r.refresh_uptime();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["uptime_pct"], 25);
    }

    #[test]
    fn test_history_bounded() {
        let mut r = MonitoredResource::new("a", "http://a", ResourceKind::Http, 60);
        for _ in 0..HISTORY_LIMIT {
            r.push_history(ResourceStatus::Up);
        }
        assert_eq!(r.history.len(), HISTORY_LIMIT);

        r.push_history(ResourceStatus::Down);
        assert_eq!(r.history.len(), HISTORY_LIMIT);
        // oldest evicted, newest last
        assert_eq!(r.history[HISTORY_LIMIT - 1], ResourceStatus::Down);
        assert!(r.history[..HISTORY_LIMIT - 1]
            .iter()
            .all(|s| *s == ResourceStatus::Up));
    }

    #[test]
    fn test_new_resource_zeroed() {
        let r = MonitoredResource::new("web", "https://example.com", ResourceKind::Https, 30);
        assert_eq!(r.status, ResourceStatus::Unknown);
        assert_eq!(r.consecutive_failures, 0);
        assert!(!r.alert_sent);
        assert!(!r.stopped);
        assert!(r.history.is_empty());
        assert!(r.last_check_at.is_none());
    }
}
