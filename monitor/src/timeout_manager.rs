//! Deadline enforcement for in-flight checks
//!
//! Each operation gets a timer at `timeout + buffer`. When it fires, the
//! operation is cancelled in the registry so any late result is discarded.
//! The timer never writes monitor status itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::operation_registry::OperationRegistry;

pub struct TimeoutManager {
    registry: Arc<OperationRegistry>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>, // operation_id -> timer task
    buffer: Duration,
}

impl TimeoutManager {
    pub fn new(registry: Arc<OperationRegistry>, buffer: Duration) -> Self {
        Self {
            registry,
            pending: Arc::new(Mutex::new(HashMap::new())),
            buffer,
        }
    }

    /// Schedule cancellation of `operation_id` after `timeout` plus the buffer.
    /// Re-arming an operation replaces its previous timer.
    pub async fn arm(&self, operation_id: &str, timeout: Duration) {
        let deadline = timeout + self.buffer;
        let registry = self.registry.clone();
        let pending = self.pending.clone();
        let id = operation_id.to_string();

        // Hold the lock across spawn so the timer cannot remove itself before insertion
        let mut timers = self.pending.lock().await;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;

            if let Some(op) = registry.cancel(&id).await {
                warn!(
                    "Operation {} for monitor {} timed out after {}ms; late result will be discarded",
                    id,
                    op.monitor_id,
                    deadline.as_millis()
                );
            } else {
                debug!("Timeout for {} fired after operation finished", id);
            }

            pending.lock().await.remove(&id);
        });

        if let Some(previous) = timers.insert(operation_id.to_string(), handle) {
            previous.abort();
        }
    }

    /// Cancel the timer for `operation_id`. Safe to call more than once.
    pub async fn disarm(&self, operation_id: &str) -> bool {
        let mut timers = self.pending.lock().await;
        match timers.remove(operation_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of timers that have neither fired nor been disarmed
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
