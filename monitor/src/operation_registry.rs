//! Operation registry for in-flight checks
//!
//! Every check attempt is tagged with an operation id issued here. The
//! registry is the only authority on whether a check is still current: a
//! result whose operation was cancelled (stop/start, supersession, timeout)
//! or already consumed must not touch monitor state.
//!
//! # Usage
//!
//! ```ignore
//! let operation = registry.begin("site-api").await?;
//!
//! // run the probe with operation.token ...
//!
//! if registry.is_valid(&operation.operation_id).await {
//!     // safe to write
//! }
//! registry.complete(&operation.operation_id).await;
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::operations::MAX_ID_ATTEMPTS;
use crate::errors::{MonitorError, MonitorResult};

pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct CheckOperation {
    pub operation_id: String,
    pub monitor_id: String,
    pub initiated_at: DateTime<Utc>,
    pub cancelled: bool,
    /// Fired when the operation is cancelled; executors observe it
    #[serde(skip_serializing)]
    pub token: CancellationToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub operations: Vec<CheckOperation>,
    pub total_active: usize,
    pub total_cancelled: usize,
}

pub struct OperationRegistry {
    operations: Arc<RwLock<HashMap<String, CheckOperation>>>, // operation_id -> operation
    id_generator: IdGenerator,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(|| Uuid::new_v4().to_string()))
    }

    pub fn with_id_generator(id_generator: IdGenerator) -> Self {
        Self {
            operations: Arc::new(RwLock::new(HashMap::new())),
            id_generator,
        }
    }

    /// Register a new operation for a monitor
    #[instrument(skip(self), fields(monitor = %monitor_id))]
    pub async fn begin(&self, monitor_id: &str) -> MonitorResult<CheckOperation> {
        let mut operations = self.operations.write().await;
        self.insert_locked(&mut operations, monitor_id)
    }

    /// Register a new operation unless the monitor already has a live one.
    /// Returns `Ok(None)` when the monitor is busy.
    #[instrument(skip(self), fields(monitor = %monitor_id))]
    pub async fn try_begin_exclusive(
        &self,
        monitor_id: &str,
    ) -> MonitorResult<Option<CheckOperation>> {
        let mut operations = self.operations.write().await;

        if let Some(current) = operations
            .values()
            .find(|op| op.monitor_id == monitor_id && !op.cancelled)
        {
            debug!(
                "Monitor {} busy with operation {} (started {})",
                monitor_id, current.operation_id, current.initiated_at
            );
            return Ok(None);
        }

        self.insert_locked(&mut operations, monitor_id).map(Some)
    }

    fn insert_locked(
        &self,
        operations: &mut HashMap<String, CheckOperation>,
        monitor_id: &str,
    ) -> MonitorResult<CheckOperation> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let operation_id = (self.id_generator)();
            if operations.contains_key(&operation_id) {
                warn!(
                    "Operation id collision for monitor {} (attempt {}/{})",
                    monitor_id, attempt, MAX_ID_ATTEMPTS
                );
                continue;
            }

            let operation = CheckOperation {
                operation_id: operation_id.clone(),
                monitor_id: monitor_id.to_string(),
                initiated_at: Utc::now(),
                cancelled: false,
                token: CancellationToken::new(),
            };
            operations.insert(operation_id.clone(), operation.clone());
            debug!("Began operation {} for {}", operation_id, monitor_id);
            return Ok(operation);
        }

        Err(MonitorError::OperationCollision {
            monitor_id: monitor_id.to_string(),
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// True only for a registered, non-cancelled operation
    pub async fn is_valid(&self, operation_id: &str) -> bool {
        let operations = self.operations.read().await;
        operations
            .get(operation_id)
            .map(|op| !op.cancelled)
            .unwrap_or(false)
    }

    /// Cancel one operation. Returns the operation if this call cancelled it.
    pub async fn cancel(&self, operation_id: &str) -> Option<CheckOperation> {
        let mut operations = self.operations.write().await;
        match operations.get_mut(operation_id) {
            Some(op) if !op.cancelled => {
                op.cancelled = true;
                op.token.cancel();
                Some(op.clone())
            }
            _ => None,
        }
    }

    /// Cancel every live operation of a monitor, returns how many were cancelled
    #[instrument(skip(self), fields(monitor = %monitor_id))]
    pub async fn cancel_all(&self, monitor_id: &str) -> usize {
        let mut operations = self.operations.write().await;
        let mut cancelled = 0;

        for op in operations
            .values_mut()
            .filter(|op| op.monitor_id == monitor_id && !op.cancelled)
        {
            op.cancelled = true;
            op.token.cancel();
            cancelled += 1;
        }

        if cancelled > 0 {
            info!("Cancelled {} operation(s) for {}", cancelled, monitor_id);
        }
        cancelled
    }

    /// Remove an operation. Removing a missing record is not an error.
    pub async fn complete(&self, operation_id: &str) -> Option<CheckOperation> {
        let mut operations = self.operations.write().await;
        let removed = operations.remove(operation_id);
        if let Some(op) = &removed {
            let duration = Utc::now().signed_duration_since(op.initiated_at);
            debug!(
                "Completed operation {} for {} (took {}ms, cancelled: {})",
                operation_id,
                op.monitor_id,
                duration.num_milliseconds(),
                op.cancelled
            );
        }
        removed
    }

    pub async fn get(&self, operation_id: &str) -> Option<CheckOperation> {
        let operations = self.operations.read().await;
        operations.get(operation_id).cloned()
    }

    pub async fn operations_for(&self, monitor_id: &str) -> Vec<CheckOperation> {
        let operations = self.operations.read().await;
        operations
            .values()
            .filter(|op| op.monitor_id == monitor_id)
            .cloned()
            .collect()
    }

    /// Ids of every registered operation, cancelled or not
    pub async fn registered_ids(&self) -> HashSet<String> {
        let operations = self.operations.read().await;
        operations.keys().cloned().collect()
    }

    pub async fn status(&self) -> RegistryStatus {
        let operations = self.operations.read().await;
        let mut list: Vec<CheckOperation> = operations.values().cloned().collect();
        list.sort_by(|a, b| a.initiated_at.cmp(&b.initiated_at));
        let total_cancelled = list.iter().filter(|op| op.cancelled).count();

        RegistryStatus {
            total_active: list.len() - total_cancelled,
            total_cancelled,
            operations: list,
        }
    }

    /// Drop cancelled operations older than `max_age` whose results never came back
    pub async fn reap_cancelled(&self, max_age: chrono::Duration) -> u32 {
        let mut operations = self.operations.write().await;
        let cutoff = Utc::now() - max_age;
        let initial_count = operations.len();

        operations.retain(|operation_id, op| {
            let keep = !op.cancelled || op.initiated_at > cutoff;
            if !keep {
                warn!(
                    "Reaped abandoned operation {} for {} (started {})",
                    operation_id, op.monitor_id, op.initiated_at
                );
            }
            keep
        });

        (initial_count - operations.len()) as u32
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
