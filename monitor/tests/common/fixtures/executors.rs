//! Stub check executors

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use monitor::errors::ProbeError;
use monitor::probes::CheckExecutor;
use monitor::types::{CheckResult, Monitor};

/// Returns results from a script, repeating the last one, and records call times
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<CheckResult>>,
    last: Mutex<CheckResult>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedExecutor {
    pub fn new(results: Vec<CheckResult>) -> Self {
        let last = results
            .last()
            .cloned()
            .unwrap_or_else(|| CheckResult::up(1, "ok"));
        Self {
            script: Mutex::new(results.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(result: CheckResult) -> Self {
        Self::new(vec![result])
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CheckExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _monitor: &Monitor,
        _cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => {
                *self.last.lock().unwrap() = result.clone();
                Ok(result)
            }
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

/// Blocks every check until released. Observes cancellation like a real probe.
pub struct GatedExecutor {
    gate: Notify,
    result: CheckResult,
    started: AtomicUsize,
    started_notify: Notify,
}

impl GatedExecutor {
    pub fn new(result: CheckResult) -> Self {
        Self {
            gate: Notify::new(),
            result,
            started: AtomicUsize::new(0),
            started_notify: Notify::new(),
        }
    }

    /// Let every waiting check finish
    pub fn release(&self) {
        self.gate.notify_waiters();
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` checks entered the executor
    pub async fn wait_started(&self, count: usize) {
        loop {
            let notified = self.started_notify.notified();
            if self.started() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CheckExecutor for GatedExecutor {
    async fn execute(
        &self,
        _monitor: &Monitor,
        cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        let released = self.gate.notified();
        self.started.fetch_add(1, Ordering::SeqCst);
        self.started_notify.notify_waiters();

        tokio::select! {
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            _ = released => Ok(self.result.clone()),
        }
    }
}

/// Never returns and ignores cancellation
pub struct HangingExecutor;

#[async_trait]
impl CheckExecutor for HangingExecutor {
    async fn execute(
        &self,
        _monitor: &Monitor,
        _cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        std::future::pending().await
    }
}

/// Simulates a programming fault inside a probe
pub struct PanickingExecutor;

#[async_trait]
impl CheckExecutor for PanickingExecutor {
    async fn execute(
        &self,
        _monitor: &Monitor,
        _cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        panic!("probe exploded");
    }
}

/// Reports an executor-level error instead of a result
pub struct UnsupportedExecutor;

#[async_trait]
impl CheckExecutor for UnsupportedExecutor {
    async fn execute(
        &self,
        monitor: &Monitor,
        _cancel: CancellationToken,
    ) -> Result<CheckResult, ProbeError> {
        Err(ProbeError::Unsupported(
            monitor.monitor_type.type_name().to_string(),
        ))
    }
}
