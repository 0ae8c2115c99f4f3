use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use crate::types::CheckResult;

pub(super) async fn probe(host: &str, port: u16, timeout: Duration) -> CheckResult {
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, TcpStream::connect((host, port))).await;
    let elapsed = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(_stream)) => CheckResult::up(elapsed, format!("connected to {}:{}", host, port)),
        Ok(Err(e)) => CheckResult::down(elapsed, format!("connection failed: {}", e)),
        Err(_) => CheckResult::down(
            elapsed,
            format!("connection timed out after {}ms", timeout.as_millis()),
        ),
    }
}
