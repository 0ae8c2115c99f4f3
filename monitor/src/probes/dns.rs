use std::net::IpAddr;
use std::time::{Duration, Instant};

use crate::types::CheckResult;

pub(super) async fn probe(
    hostname: &str,
    expected_address: Option<IpAddr>,
    timeout: Duration,
) -> CheckResult {
    let start = Instant::now();
    let lookup = tokio::time::timeout(timeout, tokio::net::lookup_host((hostname, 0))).await;
    let elapsed = start.elapsed().as_millis() as u64;

    let addresses: Vec<IpAddr> = match lookup {
        Ok(Ok(addrs)) => addrs.map(|addr| addr.ip()).collect(),
        Ok(Err(e)) => return CheckResult::down(elapsed, format!("lookup failed: {}", e)),
        Err(_) => {
            return CheckResult::down(
                elapsed,
                format!("lookup timed out after {}ms", timeout.as_millis()),
            )
        }
    };

    if addresses.is_empty() {
        return CheckResult::down(elapsed, format!("{} resolved to no addresses", hostname));
    }

    let listed = addresses
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    match expected_address {
        Some(expected) if !addresses.contains(&expected) => CheckResult::down(
            elapsed,
            format!("{} not among resolved addresses [{}]", expected, listed),
        ),
        _ => CheckResult::up(elapsed, listed),
    }
}
