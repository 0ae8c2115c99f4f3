use rand::random;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};

use crate::errors::ProbeError;
use crate::types::CheckResult;

pub(super) async fn probe(host: &str, timeout: Duration) -> Result<CheckResult, ProbeError> {
    let start = Instant::now();

    let address = match host.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => match tokio::net::lookup_host((host, 0)).await {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => addr.ip(),
                None => {
                    return Err(ProbeError::InvalidTarget {
                        target: host.to_string(),
                        reason: "resolved to no addresses".to_string(),
                    })
                }
            },
            Err(e) => {
                return Ok(CheckResult::down(
                    start.elapsed().as_millis() as u64,
                    format!("could not resolve {}: {}", host, e),
                ))
            }
        },
    };

    let config = match address {
        IpAddr::V4(_) => Config::default(),
        IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
    };

    // Raw ICMP sockets need privileges; without them the monitor reports down
    let client = match Client::new(&config) {
        Ok(client) => client,
        Err(e) => {
            return Ok(CheckResult::down(
                start.elapsed().as_millis() as u64,
                format!("ICMP socket unavailable: {}", e),
            ))
        }
    };

    let mut pinger = client.pinger(address, PingIdentifier(random())).await;
    pinger.timeout(timeout);

    let result = match pinger.ping(PingSequence(0), &[]).await {
        Ok((_reply, rtt)) => {
            let rtt_ms = rtt.as_millis() as u64;
            CheckResult::up(rtt_ms, format!("reply from {} in {}ms", address, rtt_ms))
        }
        Err(e) => CheckResult::down(
            start.elapsed().as_millis() as u64,
            format!("ping failed: {}", e),
        ),
    };
    Ok(result)
}
