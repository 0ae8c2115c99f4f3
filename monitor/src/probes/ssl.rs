//! TLS certificate check: an HTTPS request that only succeeds when the
//! handshake and certificate verification pass. Any HTTP status counts.

use std::time::{Duration, Instant};

use crate::types::CheckResult;

pub(super) async fn probe(
    client: &reqwest::Client,
    host: &str,
    port: u16,
    timeout: Duration,
) -> CheckResult {
    let url = tls_url(host, port);

    let start = Instant::now();
    let response = client.head(&url).timeout(timeout).send().await;
    let elapsed = start.elapsed().as_millis() as u64;

    match response {
        Ok(response) => CheckResult::up(
            elapsed,
            format!("certificate valid (HTTP {})", response.status().as_u16()),
        ),
        Err(e) if e.is_timeout() => CheckResult::down(
            elapsed,
            format!("TLS handshake timed out after {}ms", timeout.as_millis()),
        ),
        Err(e) => CheckResult::down(elapsed, format!("TLS check failed: {}", e)),
    }
}

fn tls_url(host: &str, port: u16) -> String {
    if port == 443 {
        format!("https://{}/", host)
    } else {
        format!("https://{}:{}/", host, port)
    }
}
