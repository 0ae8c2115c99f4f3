// File: monitor/src/services/monitoring_service.rs
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::checker::{CheckOutcome, MonitorChecker};
use crate::constants::limits::MAX_HISTORY_PAGE;
use crate::database::{Database, HistoryEntry};
use crate::errors::{MonitorError, MonitorResult};
use crate::events::{EventBus, MonitorEvent};
use crate::operation_registry::{OperationRegistry, RegistryStatus};
use crate::scheduler::MonitorScheduler;
use crate::services::StatusUpdateService;
use crate::types::{CheckKind, CheckResult, Monitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StopSummary {
    pub attempted: usize,
    pub stopped: usize,
    /// Monitors still being monitored across all sites after the call
    pub still_active: usize,
}

/// Entry point for callers outside the engine (API handlers, startup code)
pub struct MonitoringService {
    database: Arc<Database>,
    registry: Arc<OperationRegistry>,
    checker: Arc<MonitorChecker>,
    scheduler: Arc<MonitorScheduler>,
    status_updates: Arc<StatusUpdateService>,
    events: Arc<EventBus>,
}

impl MonitoringService {
    pub fn new(
        database: Arc<Database>,
        registry: Arc<OperationRegistry>,
        checker: Arc<MonitorChecker>,
        scheduler: Arc<MonitorScheduler>,
        status_updates: Arc<StatusUpdateService>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            database,
            registry,
            checker,
            scheduler,
            status_updates,
            events,
        }
    }

    /// Run a manual check and wait for its result
    #[instrument(skip(self))]
    pub async fn check_now(&self, monitor_id: &str) -> MonitorResult<CheckResult> {
        let monitor = self.require_monitor(monitor_id).await?;

        match self.checker.check(&monitor, CheckKind::Manual).await? {
            CheckOutcome::Completed { result, .. } => Ok(result),
            // Manual checks never take the exclusive path
            CheckOutcome::Skipped { monitor_id } => Err(MonitorError::invalid(
                &monitor_id,
                "manual check was skipped",
            )),
        }
    }

    #[instrument(skip(self))]
    pub async fn start_monitoring(&self, site_id: Option<&str>) -> MonitorResult<StartSummary> {
        let monitors = self.monitors_in_scope(site_id).await?;
        let mut summary = StartSummary {
            attempted: monitors.len(),
            succeeded: 0,
            failed: 0,
        };

        for monitor in monitors {
            match self.start_one(&monitor.id).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!("Failed to start monitoring {}: {}", monitor.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Start monitoring: {} attempted, {} succeeded, {} failed",
            summary.attempted, summary.succeeded, summary.failed
        );
        self.events.publish(MonitorEvent::MonitoringStarted {
            monitor_count: summary.succeeded,
        });

        Ok(summary)
    }

    async fn start_one(&self, monitor_id: &str) -> MonitorResult<()> {
        if !self.database.mark_monitoring_started(monitor_id).await? {
            return Err(MonitorError::not_found(monitor_id));
        }
        let monitor = self.require_monitor(monitor_id).await?;
        self.scheduler.start(monitor).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop_monitoring(&self, site_id: Option<&str>) -> MonitorResult<StopSummary> {
        let monitors = self.monitors_in_scope(site_id).await?;
        let attempted = monitors.len();
        let mut stopped = 0;

        for monitor in monitors {
            // Clear the flag first: from here on no status write can land,
            // even from a check that starts before its timer is cancelled
            match self.status_updates.mark_monitoring_stopped(&monitor.id).await {
                Ok(true) => stopped += 1,
                Ok(false) => error!("Monitor {} vanished while stopping", monitor.id),
                Err(e) => error!("Failed to stop monitoring {}: {}", monitor.id, e),
            }

            self.scheduler.stop(&monitor.id).await;
        }

        let still_active = self.database.count_monitoring().await?;

        info!(
            "Stop monitoring: {} attempted, {} stopped, {} still active",
            attempted, stopped, still_active
        );
        self.events.publish(MonitorEvent::MonitoringStopped {
            remaining_active: still_active,
        });

        Ok(StopSummary {
            attempted,
            stopped,
            still_active,
        })
    }

    pub async fn list_monitors(&self, site_id: Option<&str>) -> MonitorResult<Vec<Monitor>> {
        self.database.list_monitors(site_id).await
    }

    pub async fn get_monitor(&self, monitor_id: &str) -> MonitorResult<Monitor> {
        self.require_monitor(monitor_id).await
    }

    pub async fn history(&self, monitor_id: &str, limit: u32) -> MonitorResult<Vec<HistoryEntry>> {
        self.require_monitor(monitor_id).await?;
        self.database
            .get_history(monitor_id, limit.clamp(1, MAX_HISTORY_PAGE))
            .await
    }

    /// Validate and store a new monitor, starting its timer if it is monitored
    pub async fn add_monitor(&self, monitor: Monitor) -> MonitorResult<Monitor> {
        monitor.validate()?;

        if self.database.get_site(&monitor.site_id).await?.is_none() {
            return Err(MonitorError::SiteNotFound {
                site_id: monitor.site_id.clone(),
            });
        }

        self.database.insert_monitor(&monitor).await?;
        info!(
            "Added {} monitor {} ({})",
            monitor.monitor_type.type_name(),
            monitor.id,
            monitor.monitor_type.target()
        );

        if monitor.is_monitoring {
            self.scheduler.start(monitor.clone()).await;
        }
        Ok(monitor)
    }

    /// Stop every monitor of the site, then delete it with its monitors and history
    #[instrument(skip(self))]
    pub async fn delete_site(&self, site_id: &str) -> MonitorResult<u64> {
        for monitor in self.monitors_in_scope(Some(site_id)).await? {
            self.scheduler.stop(&monitor.id).await;
        }
        self.database.delete_site(site_id).await
    }

    /// Recreate timers for monitors persisted as monitored (process start)
    pub async fn resume_active_monitors(&self) -> MonitorResult<usize> {
        let monitors = self.database.list_monitors(None).await?;
        let mut resumed = 0;

        for monitor in monitors.into_iter().filter(|m| m.is_monitoring) {
            self.scheduler.start(monitor).await;
            resumed += 1;
        }

        info!("Resumed {} monitored monitor(s)", resumed);
        Ok(resumed)
    }

    pub async fn active_operations(&self) -> RegistryStatus {
        self.registry.status().await
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    async fn require_monitor(&self, monitor_id: &str) -> MonitorResult<Monitor> {
        self.database
            .get_monitor(monitor_id)
            .await?
            .ok_or_else(|| MonitorError::not_found(monitor_id))
    }

    async fn monitors_in_scope(&self, site_id: Option<&str>) -> MonitorResult<Vec<Monitor>> {
        if let Some(site_id) = site_id {
            if self.database.get_site(site_id).await?.is_none() {
                return Err(MonitorError::SiteNotFound {
                    site_id: site_id.to_string(),
                });
            }
        }
        self.database.list_monitors(site_id).await
    }
}
