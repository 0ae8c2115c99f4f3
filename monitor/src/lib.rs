pub mod checker;
pub mod config;
pub mod constants;
pub mod database;
pub mod engine;
pub mod errors;
pub mod events;
pub mod operation_registry;
pub mod probes;
pub mod scheduler;
pub mod services;
pub mod timeout_manager;
pub mod types;
pub mod web;

// Re-export commonly used types
pub use checker::{CheckOutcome, MonitorChecker};
pub use config::{Config, ConfigManager, EngineConfig};
pub use database::Database;
pub use engine::Engine;
pub use errors::{MonitorError, MonitorResult, ProbeError};
pub use events::{EventBus, EventEnvelope, EventKind, MonitorEvent};
pub use operation_registry::OperationRegistry;
pub use probes::{CheckExecutor, ProbeExecutor};
pub use scheduler::{BackoffPolicy, MonitorScheduler};
pub use services::{MonitoringService, StatusUpdateService};
pub use timeout_manager::TimeoutManager;
pub use types::{CheckKind, CheckResult, Monitor, MonitorStatus, MonitorType};
