//! Ping probe implementation.
//!
//! A lightweight HEAD request against the bare host. The probe only asks
//! "is anything answering there", so any response below a server error
//! counts as alive; the classifier applies that rule.

use std::time::Instant;

use super::CheckOutcome;

/// Run a ping-style probe: HEAD to the bare host, path stripped.
pub async fn run_ping_check(client: &reqwest::Client, url: &str) -> CheckOutcome {
    let url = bare_host_url(url);
    let start = Instant::now();

    match client.head(&url).send().await {
        Ok(response) => CheckOutcome {
            reached: true,
            http_status: Some(response.status().as_u16()),
            response_time_ms: start.elapsed().as_millis() as u64,
            gateway_error: false,
        },
        Err(_) => CheckOutcome {
            reached: false,
            http_status: None,
            response_time_ms: start.elapsed().as_millis() as u64,
            gateway_error: false,
        },
    }
}

/// Reduce a URL to a schemed bare host: strip any path, keep host and port.
fn bare_host_url(url: &str) -> String {
    let trimmed = url.trim();
    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        ("https://", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        ("http://", rest)
    } else {
        ("http://", trimmed)
    };
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{}{}", scheme, host)
}
