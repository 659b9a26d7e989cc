//! HTTP probe implementation.

use std::time::Instant;

use super::CheckOutcome;

/// Gateway-failure signature: these statuses, or a body marker, indicate a
/// broken upstream even when the edge answered.
const GATEWAY_ERROR_STATUSES: [u16; 3] = [502, 503, 504];
const GATEWAY_ERROR_MARKER: &str = "bad gateway";

/// Run an HTTP GET probe against the given URL.
///
/// Any status code is a reachable outcome; only transport failures
/// (timeout, refused connection, DNS) yield `reached = false`.
pub async fn run_http_check(client: &reqwest::Client, url: &str) -> CheckOutcome {
    let url = normalize_url(url);
    let start = Instant::now();

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(_) => {
            return CheckOutcome {
                reached: false,
                http_status: None,
                response_time_ms: start.elapsed().as_millis() as u64,
                gateway_error: false,
            };
        }
    };

    let status = response.status().as_u16();
    let mut gateway_error = GATEWAY_ERROR_STATUSES.contains(&status);

    // Read the full body to measure complete transfer time; it also carries
    // the textual gateway-failure marker on some proxies.
    let body = response.text().await.unwrap_or_default();
    if !gateway_error {
        gateway_error = body.to_lowercase().contains(GATEWAY_ERROR_MARKER);
    }

    CheckOutcome {
        reached: true,
        http_status: Some(status),
        response_time_ms: start.elapsed().as_millis() as u64,
        gateway_error,
    }
}

/// Prepend a scheme when the stored URL has none.
pub(super) fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on an ephemeral local port.
    async fn one_shot_server(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_check_success() {
        let url =
            one_shot_server("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let client = crate::probe::build_client().unwrap();
        let outcome = run_http_check(&client, &url).await;
        assert!(outcome.reached);
        assert_eq!(outcome.http_status, Some(200));
        assert!(!outcome.gateway_error);
    }

    #[tokio::test]
    async fn test_http_check_gateway_status() {
        let url =
            one_shot_server("HTTP/1.1 502 Bad Gateway\r\ncontent-length: 0\r\n\r\n").await;
        let client = crate::probe::build_client().unwrap();
        let outcome = run_http_check(&client, &url).await;
        assert!(outcome.reached);
        assert_eq!(outcome.http_status, Some(502));
        assert!(outcome.gateway_error);
    }

    #[tokio::test]
    async fn test_http_check_gateway_body_marker() {
        let url = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 21\r\n\r\nupstream: Bad Gateway",
        )
        .await;
        let client = crate::probe::build_client().unwrap();
        let outcome = run_http_check(&client, &url).await;
        assert!(outcome.reached);
        assert!(outcome.gateway_error);
    }

    #[tokio::test]
    async fn test_http_check_connection_refused() {
        let client = crate::probe::build_client().unwrap();
        // Nothing listens on this port.
        let outcome = run_http_check(&client, "http://127.0.0.1:1").await;
        assert!(!outcome.reached);
        assert_eq!(outcome.http_status, None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }
}
