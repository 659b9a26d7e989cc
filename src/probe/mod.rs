//! Probe module for network monitoring.
//!
//! A probe never fails for network reasons: an unreachable host is a valid
//! negative [`CheckOutcome`], not an error.

mod http;
mod ping;

pub use http::*;
pub use ping::*;

use std::time::Duration;

use crate::store::ResourceKind;

/// Fixed upper bound on every probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized result of one probe.
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    /// A response of any kind was obtained.
    pub reached: bool,
    pub http_status: Option<u16>,
    /// Wall-clock time from request start to response or failure.
    pub response_time_ms: u64,
    /// Status was 502/503/504 or the body carried a "bad gateway" marker.
    pub gateway_error: bool,
}

/// Build the shared HTTP client used by all probes.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()
}

/// Run one probe for the given resource kind and URL.
pub async fn run_check(client: &reqwest::Client, kind: ResourceKind, url: &str) -> CheckOutcome {
    // Add jitter to avoid thundering herd
    let jitter = rand::random::<u64>() % 100;
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    match kind {
        ResourceKind::Http | ResourceKind::Https => run_http_check(client, url).await,
        ResourceKind::Ping => run_ping_check(client, url).await,
    }
}
