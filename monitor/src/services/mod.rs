// File: monitor/src/services/mod.rs

pub mod monitoring_service;
pub mod status_update_service;

pub use monitoring_service::{MonitoringService, StartSummary, StopSummary};
pub use status_update_service::StatusUpdateService;
