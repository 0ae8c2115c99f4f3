//! Per-monitor check timers
//!
//! Every monitored monitor gets one tokio task that checks it, sleeps for
//! the (backed-off) interval and repeats until it is stopped or the monitor
//! is no longer marked as monitored in the database.
//!
//! Stopping a timer never aborts its task mid-check. The task is signalled
//! through a `CancellationToken` and the monitor's operations are cancelled
//! in the registry, so an in-flight check returns promptly and its result is
//! discarded.

pub mod backoff;
pub use backoff::BackoffPolicy;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checker::{CheckOutcome, MonitorChecker};
use crate::database::Database;
use crate::operation_registry::OperationRegistry;
use crate::types::{CheckKind, Monitor};

struct MonitorTimer {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct MonitorScheduler {
    database: Arc<Database>,
    checker: Arc<MonitorChecker>,
    registry: Arc<OperationRegistry>,
    backoff: BackoffPolicy,
    timers: Mutex<HashMap<String, MonitorTimer>>, // monitor_id -> timer task
}

impl MonitorScheduler {
    pub fn new(
        database: Arc<Database>,
        checker: Arc<MonitorChecker>,
        registry: Arc<OperationRegistry>,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            database,
            checker,
            registry,
            backoff,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// (Re)create the timer for a monitor. The first check runs immediately
    /// and supersedes anything still in flight.
    pub async fn start(&self, monitor: Monitor) {
        let mut timers = self.timers.lock().await;

        if let Some(previous) = timers.remove(&monitor.id) {
            debug!("Replacing timer for {}", monitor.id);
            previous.stop.cancel();
        }

        let stop = CancellationToken::new();
        let monitor_id = monitor.id.clone();
        let handle = tokio::spawn(run_timer(
            monitor,
            self.database.clone(),
            self.checker.clone(),
            self.backoff,
            stop.clone(),
        ));

        info!("Started timer for {}", monitor_id);
        timers.insert(monitor_id, MonitorTimer { stop, handle });
    }

    /// Clear the timer and cancel outstanding operations. Returns whether a
    /// timer was running.
    pub async fn stop(&self, monitor_id: &str) -> bool {
        let timer = self.timers.lock().await.remove(monitor_id);
        let was_running = match timer {
            Some(timer) => {
                timer.stop.cancel();
                true
            }
            None => false,
        };

        self.registry.cancel_all(monitor_id).await;

        if was_running {
            info!("Stopped timer for {}", monitor_id);
        }
        was_running
    }

    /// Whether a live timer task exists for the monitor
    pub async fn is_scheduled(&self, monitor_id: &str) -> bool {
        let timers = self.timers.lock().await;
        timers
            .get(monitor_id)
            .map(|timer| !timer.handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn scheduled_count(&self) -> usize {
        let mut timers = self.timers.lock().await;
        timers.retain(|_, timer| !timer.handle.is_finished());
        timers.len()
    }

    /// Signal every timer and wait for the tasks to exit
    pub async fn shutdown(&self) {
        let timers: Vec<(String, MonitorTimer)> = self.timers.lock().await.drain().collect();
        info!("Shutting down {} monitor timer(s)", timers.len());

        for (monitor_id, timer) in timers {
            timer.stop.cancel();
            self.registry.cancel_all(&monitor_id).await;
            if let Err(e) = timer.handle.await {
                warn!("Timer task for {} ended abnormally: {}", monitor_id, e);
            }
        }
    }
}

async fn run_timer(
    mut monitor: Monitor,
    database: Arc<Database>,
    checker: Arc<MonitorChecker>,
    backoff: BackoffPolicy,
    stop: CancellationToken,
) {
    let mut consecutive_failures = 0u32;
    let mut first = true;

    loop {
        // A stop can land while the monitor is being reloaded
        if stop.is_cancelled() {
            break;
        }

        let outcome = if first {
            checker
                .check_superseding(&monitor, CheckKind::Scheduled)
                .await
        } else {
            checker.check(&monitor, CheckKind::Scheduled).await
        };
        first = false;

        match outcome {
            Ok(CheckOutcome::Completed {
                result, applied, ..
            }) => {
                // Discarded results say nothing about the endpoint's health
                if applied {
                    if result.is_up() {
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                    }
                }
            }
            Ok(CheckOutcome::Skipped { .. }) => {}
            Err(e) => error!("Scheduled check for {} failed: {}", monitor.id, e),
        }

        let delay = backoff.interval(monitor.check_interval(), consecutive_failures);
        if consecutive_failures > 0 {
            debug!(
                "Next check for {} in {}ms ({} consecutive failures)",
                monitor.id,
                delay.as_millis(),
                consecutive_failures
            );
        }

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        match database.get_monitor(&monitor.id).await {
            Ok(Some(current)) if current.is_monitoring => monitor = current,
            Ok(Some(_)) => {
                info!("Monitor {} is no longer monitored, timer exiting", monitor.id);
                break;
            }
            Ok(None) => {
                info!("Monitor {} was deleted, timer exiting", monitor.id);
                break;
            }
            Err(e) => warn!(
                "Could not reload monitor {}, keeping previous definition: {}",
                monitor.id, e
            ),
        }
    }

    debug!("Timer for {} exited", monitor.id);
}
