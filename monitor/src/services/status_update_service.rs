// File: monitor/src/services/status_update_service.rs
//! Turns a check result into persisted state
//!
//! The operation must still be valid in the registry and the monitor must
//! still be monitored, both checked inside the write transaction. Events are
//! published only after commit, under a per-monitor lock so subscribers see
//! them in commit order.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::database::{Database, MonitorState};
use crate::errors::MonitorResult;
use crate::events::{CheckCompletedEvent, EventBus, MonitorEvent, StatusChangedEvent};
use crate::operation_registry::OperationRegistry;
use crate::timeout_manager::TimeoutManager;
use crate::types::{CheckKind, CheckResult, LastResult, MonitorStatus};

/// What a single `apply` call is going to do with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    /// Operation cancelled, superseded or unknown
    Discard,
    /// Manual check on a paused monitor: history and last result, status kept
    RecordOnly,
    /// Monitor stopped while the check ran
    Unmonitored { record_history: bool },
    /// Normal path
    Apply,
}

fn plan(valid: bool, state: &MonitorState, kind: CheckKind, record_discarded: bool) -> Plan {
    if !valid {
        return Plan::Discard;
    }
    if kind == CheckKind::Manual && state.status == MonitorStatus::Paused {
        return Plan::RecordOnly;
    }
    if !state.is_monitoring {
        return Plan::Unmonitored {
            record_history: record_discarded,
        };
    }
    Plan::Apply
}

/// Per-monitor write locks. Only weak references are kept, so a lock lives
/// as long as someone holds it and the map never outgrows the monitors
/// currently being written.
#[derive(Default)]
struct MonitorLocks {
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl MonitorLocks {
    async fn acquire(&self, monitor_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = locks.get(monitor_id).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(monitor_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct StatusUpdateService {
    database: Arc<Database>,
    registry: Arc<OperationRegistry>,
    timeouts: Arc<TimeoutManager>,
    events: Arc<EventBus>,
    history_retention_limit: u32,
    record_discarded_checks: bool,
    monitor_locks: MonitorLocks,
}

impl StatusUpdateService {
    pub fn new(
        database: Arc<Database>,
        registry: Arc<OperationRegistry>,
        timeouts: Arc<TimeoutManager>,
        events: Arc<EventBus>,
        engine: &EngineConfig,
    ) -> Self {
        Self {
            database,
            registry,
            timeouts,
            events,
            history_retention_limit: engine.history_retention_limit,
            record_discarded_checks: engine.record_discarded_checks,
            monitor_locks: MonitorLocks::default(),
        }
    }

    /// Clear the monitoring flag under the monitor's write lock. A result
    /// committed before this call has published its events by the time it
    /// returns; one applied after it sees the monitor as stopped.
    pub async fn mark_monitoring_stopped(&self, monitor_id: &str) -> MonitorResult<bool> {
        let lock = self.monitor_locks.acquire(monitor_id).await;
        let _guard = lock.lock().await;
        self.database.mark_monitoring_stopped(monitor_id).await
    }

    /// Persist a check result. Returns whether the monitor status was written.
    ///
    /// On a storage error nothing is committed, the operation stays registered
    /// and its timeout stays armed.
    pub async fn apply(
        &self,
        operation_id: &str,
        monitor_id: &str,
        result: &CheckResult,
        kind: CheckKind,
    ) -> MonitorResult<bool> {
        let lock = self.monitor_locks.acquire(monitor_id).await;
        let _guard = lock.lock().await;

        let checked_at = Utc::now();
        let mut tx = self.database.begin().await?;

        let Some(state) = Database::load_monitor_state(&mut tx, monitor_id).await? else {
            // Monitor deleted while the check ran
            drop(tx);
            debug!(
                "Monitor {} no longer exists, dropping result of {}",
                monitor_id, operation_id
            );
            self.finish(operation_id).await;
            self.publish_completed(monitor_id, None, kind, result, false, operation_id, checked_at);
            return Ok(false);
        };

        let valid = self.registry.is_valid(operation_id).await;
        let plan = plan(valid, &state, kind, self.record_discarded_checks);
        let last_result = LastResult::from_check(result, checked_at);

        let applied = match plan {
            Plan::Discard => {
                debug!(
                    "Discarding stale result of operation {} for {}",
                    operation_id, monitor_id
                );
                false
            }
            Plan::RecordOnly => {
                Database::insert_history(&mut tx, monitor_id, result, checked_at).await?;
                Database::write_last_result(&mut tx, monitor_id, &last_result).await?;
                false
            }
            Plan::Unmonitored { record_history } => {
                debug!(
                    "Monitor {} stopped during operation {}, status left as {}",
                    monitor_id, operation_id, state.status
                );
                if record_history {
                    Database::insert_history(&mut tx, monitor_id, result, checked_at).await?;
                }
                false
            }
            Plan::Apply => {
                let new_status = MonitorStatus::from(result.status);
                let written =
                    Database::write_status(&mut tx, monitor_id, new_status, &last_result).await?;
                Database::insert_history(&mut tx, monitor_id, result, checked_at).await?;
                written
            }
        };

        if plan != Plan::Discard {
            Database::prune_history(&mut tx, monitor_id, self.history_retention_limit).await?;
        }

        if state.active_operations.iter().any(|id| id == operation_id) {
            let remaining: Vec<String> = state
                .active_operations
                .iter()
                .filter(|id| id.as_str() != operation_id)
                .cloned()
                .collect();
            Database::set_active_operations(&mut tx, monitor_id, &remaining).await?;
        }

        if let Err(e) = tx.commit().await {
            error!(
                "Failed to commit result of operation {} for {}: {}",
                operation_id, monitor_id, e
            );
            return Err(e.into());
        }

        self.finish(operation_id).await;

        self.publish_completed(
            monitor_id,
            Some(state.site_id),
            kind,
            result,
            applied,
            operation_id,
            checked_at,
        );

        let new_status = MonitorStatus::from(result.status);
        if applied && new_status != state.status {
            info!(
                "Monitor {} changed {} -> {}",
                monitor_id, state.status, new_status
            );
            self.events
                .publish(MonitorEvent::StatusChanged(StatusChangedEvent {
                    monitor_id: monitor_id.to_string(),
                    previous_status: state.status,
                    new_status,
                    timestamp: checked_at,
                    operation_id: operation_id.to_string(),
                }));
        }

        Ok(applied)
    }

    async fn finish(&self, operation_id: &str) {
        self.registry.complete(operation_id).await;
        self.timeouts.disarm(operation_id).await;
    }

    #[allow(clippy::too_many_arguments)]
    fn publish_completed(
        &self,
        monitor_id: &str,
        site_id: Option<String>,
        kind: CheckKind,
        result: &CheckResult,
        applied: bool,
        operation_id: &str,
        timestamp: chrono::DateTime<Utc>,
    ) {
        self.events
            .publish(MonitorEvent::CheckCompleted(CheckCompletedEvent {
                monitor_id: monitor_id.to_string(),
                site_id,
                check_kind: kind,
                result: result.clone(),
                applied,
                timestamp,
                operation_id: operation_id.to_string(),
            }));
    }
}
