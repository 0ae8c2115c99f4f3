//! Monitor checker: runs one check from operation registration to status write
//!
//! Scheduled checks are skipped while the monitor has a live operation.
//! Manual checks always run. The lifecycle path (`check_superseding`) first
//! cancels whatever is in flight for the monitor.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::errors::{MonitorResult, ProbeError};
use crate::operation_registry::OperationRegistry;
use crate::probes::CheckExecutor;
use crate::services::StatusUpdateService;
use crate::timeout_manager::TimeoutManager;
use crate::types::{CheckKind, CheckResult, Monitor};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Another check for the monitor was still outstanding
    Skipped { monitor_id: String },
    Completed {
        operation_id: String,
        result: CheckResult,
        applied: bool,
    },
}

impl CheckOutcome {
    pub fn result(&self) -> Option<&CheckResult> {
        match self {
            CheckOutcome::Completed { result, .. } => Some(result),
            CheckOutcome::Skipped { .. } => None,
        }
    }
}

pub struct MonitorChecker {
    database: Arc<Database>,
    registry: Arc<OperationRegistry>,
    timeouts: Arc<TimeoutManager>,
    executor: Arc<dyn CheckExecutor>,
    status_updates: Arc<StatusUpdateService>,
}

impl MonitorChecker {
    pub fn new(
        database: Arc<Database>,
        registry: Arc<OperationRegistry>,
        timeouts: Arc<TimeoutManager>,
        executor: Arc<dyn CheckExecutor>,
        status_updates: Arc<StatusUpdateService>,
    ) -> Self {
        Self {
            database,
            registry,
            timeouts,
            executor,
            status_updates,
        }
    }

    pub async fn check(&self, monitor: &Monitor, kind: CheckKind) -> MonitorResult<CheckOutcome> {
        self.run_check(monitor, kind, false).await
    }

    /// Cancel in-flight checks for the monitor, then check
    pub async fn check_superseding(
        &self,
        monitor: &Monitor,
        kind: CheckKind,
    ) -> MonitorResult<CheckOutcome> {
        self.run_check(monitor, kind, true).await
    }

    async fn run_check(
        &self,
        monitor: &Monitor,
        kind: CheckKind,
        supersede: bool,
    ) -> MonitorResult<CheckOutcome> {
        if supersede {
            self.registry.cancel_all(&monitor.id).await;
        }

        let operation = match kind {
            CheckKind::Scheduled => match self.registry.try_begin_exclusive(&monitor.id).await? {
                Some(operation) => operation,
                None => {
                    info!(
                        "Skipping scheduled check for {}: previous check still outstanding",
                        monitor.id
                    );
                    return Ok(CheckOutcome::Skipped {
                        monitor_id: monitor.id.clone(),
                    });
                }
            },
            CheckKind::Manual => self.registry.begin(&monitor.id).await?,
        };
        let operation_id = operation.operation_id.clone();

        if let Err(e) = self
            .database
            .add_active_operation(&monitor.id, &operation_id)
            .await
        {
            error!(
                "Failed to record operation {} for {}: {}",
                operation_id, monitor.id, e
            );
            self.registry.complete(&operation_id).await;
            return Err(e);
        }

        self.timeouts
            .arm(&operation_id, self.executor.deadline(monitor))
            .await;

        debug!(
            "Running {} check {} for {} ({})",
            kind,
            operation_id,
            monitor.id,
            monitor.monitor_type.target()
        );

        let start = Instant::now();
        let token = operation.token.clone();
        let execution = AssertUnwindSafe(self.executor.execute(monitor, token.clone())).catch_unwind();

        let outcome = tokio::select! {
            _ = token.cancelled() => Ok(Err(ProbeError::Cancelled)),
            outcome = execution => outcome,
        };

        let elapsed = start.elapsed().as_millis() as u64;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                debug!("Check {} for {} ended without a probe result: {}", operation_id, monitor.id, e);
                CheckResult::down(elapsed, e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!("Executor panicked checking {}: {}", monitor.id, message);
                CheckResult::down(elapsed, format!("executor panicked: {}", message))
            }
        };

        let applied = self
            .status_updates
            .apply(&operation_id, &monitor.id, &result, kind)
            .await?;

        Ok(CheckOutcome::Completed {
            operation_id,
            result,
            applied,
        })
    }
}
