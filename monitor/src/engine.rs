//! Wiring of the check engine components
//!
//! Every component is constructed explicitly and shares the same registry,
//! timeout manager and event bus.

use std::sync::Arc;
use tracing::info;

use crate::checker::MonitorChecker;
use crate::config::EngineConfig;
use crate::database::Database;
use crate::events::EventBus;
use crate::operation_registry::OperationRegistry;
use crate::probes::CheckExecutor;
use crate::scheduler::MonitorScheduler;
use crate::services::{MonitoringService, StatusUpdateService};
use crate::timeout_manager::TimeoutManager;

#[derive(Clone)]
pub struct Engine {
    pub database: Arc<Database>,
    pub registry: Arc<OperationRegistry>,
    pub timeouts: Arc<TimeoutManager>,
    pub events: Arc<EventBus>,
    pub status_updates: Arc<StatusUpdateService>,
    pub checker: Arc<MonitorChecker>,
    pub scheduler: Arc<MonitorScheduler>,
    pub monitoring: Arc<MonitoringService>,
}

impl Engine {
    pub fn new(
        database: Arc<Database>,
        executor: Arc<dyn CheckExecutor>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_registry(database, executor, Arc::new(OperationRegistry::new()), config)
    }

    pub fn with_registry(
        database: Arc<Database>,
        executor: Arc<dyn CheckExecutor>,
        registry: Arc<OperationRegistry>,
        config: &EngineConfig,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let timeouts = Arc::new(TimeoutManager::new(
            registry.clone(),
            config.timeout_buffer(),
        ));

        let status_updates = Arc::new(StatusUpdateService::new(
            database.clone(),
            registry.clone(),
            timeouts.clone(),
            events.clone(),
            config,
        ));

        let checker = Arc::new(MonitorChecker::new(
            database.clone(),
            registry.clone(),
            timeouts.clone(),
            executor,
            status_updates.clone(),
        ));

        let scheduler = Arc::new(MonitorScheduler::new(
            database.clone(),
            checker.clone(),
            registry.clone(),
            config.backoff,
        ));

        let monitoring = Arc::new(MonitoringService::new(
            database.clone(),
            registry.clone(),
            checker.clone(),
            scheduler.clone(),
            status_updates.clone(),
            events.clone(),
        ));

        info!("Check engine initialized (event bus {})", events.id());

        Self {
            database,
            registry,
            timeouts,
            events,
            status_updates,
            checker,
            scheduler,
            monitoring,
        }
    }

    /// Clear persisted operation ids the registry does not know about
    pub async fn reconcile(&self) -> crate::errors::MonitorResult<u32> {
        let registered = self.registry.registered_ids().await;
        self.database.reconcile_active_operations(&registered).await
    }
}
