//! Check executors
//!
//! The engine only sees the [`CheckExecutor`] trait. [`ProbeExecutor`] is the
//! built-in implementation: it dispatches over [`MonitorType`], retries a
//! failing probe up to `retry_attempts` times and gives up as soon as the
//! operation's cancellation token fires.

mod dns;
mod http;
mod ping;
mod port;
mod ssl;

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ProbeError;
use crate::types::{CheckResult, CompositeMode, Monitor, MonitorType};

/// Runs one check for a monitor. Unreachable targets are `down` results;
/// `Err` is reserved for cancellation and unusable definitions.
#[async_trait]
pub trait CheckExecutor: Send + Sync {
    async fn execute(
        &self,
        monitor: &Monitor,
        cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError>;

    /// Longest a single `execute` call may legitimately take. The engine
    /// cancels the operation once this (plus its buffer) has elapsed.
    fn deadline(&self, monitor: &Monitor) -> Duration {
        monitor.timeout()
    }
}

type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<CheckResult, ProbeError>> + Send + 'a>>;

pub struct ProbeExecutor {
    client: reqwest::Client,
    retry_delay: Duration,
}

impl ProbeExecutor {
    pub fn new(retry_delay: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            retry_delay,
        })
    }

    /// Single attempt for one probe definition
    fn probe<'a>(&'a self, probe: &'a MonitorType, timeout: Duration) -> ProbeFuture<'a> {
        Box::pin(async move {
            match probe {
                MonitorType::Http {
                    url,
                    expected_status,
                } => Ok(http::probe(&self.client, url, *expected_status, timeout).await),
                MonitorType::Port { host, port } => Ok(port::probe(host, *port, timeout).await),
                MonitorType::Ping { host } => ping::probe(host, timeout).await,
                MonitorType::Dns {
                    hostname,
                    expected_address,
                } => Ok(dns::probe(hostname, *expected_address, timeout).await),
                MonitorType::Ssl { host, port } => {
                    Ok(ssl::probe(&self.client, host, *port, timeout).await)
                }
                MonitorType::Composite { checks, mode } => {
                    self.probe_composite(checks, *mode, timeout).await
                }
            }
        })
    }

    async fn probe_composite(
        &self,
        checks: &[MonitorType],
        mode: CompositeMode,
        timeout: Duration,
    ) -> Result<CheckResult, ProbeError> {
        let start = Instant::now();
        let results =
            futures::future::try_join_all(checks.iter().map(|check| self.probe(check, timeout)))
                .await?;

        let up = results.iter().filter(|r| r.is_up()).count();
        let elapsed = start.elapsed().as_millis() as u64;
        let passed = match mode {
            CompositeMode::All => up == results.len(),
            CompositeMode::Any => up > 0,
        };

        if passed {
            Ok(CheckResult::up(
                elapsed,
                format!("{}/{} checks up", up, results.len()),
            ))
        } else {
            let errors: Vec<String> = checks
                .iter()
                .zip(&results)
                .filter(|(_, r)| !r.is_up())
                .map(|(check, r)| {
                    format!(
                        "{} {}: {}",
                        check.type_name(),
                        check.target(),
                        r.error.as_deref().unwrap_or("down")
                    )
                })
                .collect();
            Ok(CheckResult::down(elapsed, errors.join("; ")))
        }
    }
}

#[async_trait]
impl CheckExecutor for ProbeExecutor {
    async fn execute(
        &self,
        monitor: &Monitor,
        cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        let attempts = monitor.retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                result = self.probe(&monitor.monitor_type, monitor.timeout()) => result?,
            };

            if result.is_up() || attempt >= attempts {
                return Ok(result);
            }

            debug!(
                "Probe for {} failed (attempt {}/{}): {}",
                monitor.id,
                attempt,
                attempts,
                result.error.as_deref().unwrap_or("down")
            );
            attempt += 1;

            tokio::select! {
                _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// Every attempt may run to its own timeout, with a pause between attempts
    fn deadline(&self, monitor: &Monitor) -> Duration {
        let attempts = monitor.retry_attempts.max(1);
        monitor
            .timeout()
            .saturating_mul(attempts)
            .saturating_add(self.retry_delay.saturating_mul(attempts - 1))
    }
}
