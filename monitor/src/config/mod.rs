// File: monitor/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
pub use manager::ConfigManager;

use crate::constants::{defaults, operations, probes, timeouts};
use crate::scheduler::BackoffPolicy;
use crate::types::{Monitor, MonitorType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub engine: EngineConfig,
    // Populated from individual site config files
    #[serde(skip)]
    pub sites: HashMap<String, SiteConfig>,
    #[serde(skip)]
    pub monitors: HashMap<String, Monitor>,
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

/// Tuning knobs of the check engine, the `[engine]` table of main.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeout_buffer_ms: u64,
    pub history_retention_limit: u32,
    /// Keep history rows for results that arrive while a monitor is not monitored
    pub record_discarded_checks: bool,
    pub probe_retry_delay_ms: u64,
    pub operation_reap_minutes: i64,
    pub backoff: BackoffPolicy,
}

impl EngineConfig {
    pub fn timeout_buffer(&self) -> Duration {
        Duration::from_millis(self.timeout_buffer_ms)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_buffer_ms: timeouts::DEFAULT_BUFFER.as_millis() as u64,
            history_retention_limit: defaults::HISTORY_RETENTION_LIMIT,
            record_discarded_checks: true,
            probe_retry_delay_ms: probes::RETRY_DELAY.as_millis() as u64,
            operation_reap_minutes: operations::REAP_AFTER_MINUTES,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfigFile {
    pub site: SiteConfig,
    #[serde(default)]
    pub monitors: HashMap<String, MonitorConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub probe: MonitorType,
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Start monitoring when the row is first created
    #[serde(default)]
    pub monitoring: bool,
}

fn default_check_interval() -> u64 {
    defaults::CHECK_INTERVAL_MS
}

fn default_timeout() -> u64 {
    defaults::TIMEOUT_MS
}

fn default_retry_attempts() -> u32 {
    defaults::RETRY_ATTEMPTS
}

impl MonitorConfig {
    pub fn into_monitor(self, id: &str, site_id: &str) -> Monitor {
        let mut monitor = Monitor::new(id, site_id, self.probe);
        monitor.check_interval_ms = self.check_interval_ms;
        monitor.timeout_ms = self.timeout_ms;
        monitor.retry_attempts = self.retry_attempts;
        monitor.is_monitoring = self.monitoring;
        monitor
    }
}
