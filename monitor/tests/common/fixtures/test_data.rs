//! Common test data and constants

use monitor::config::EngineConfig;
use monitor::scheduler::BackoffPolicy;
use monitor::types::{Monitor, MonitorStatus, MonitorType};

/// Common test site ids
pub mod sites {
    pub const SHOP: &str = "shop";
    pub const BLOG: &str = "blog";
}

/// Monitor with an HTTP probe that is never contacted by stub executors
pub fn http_monitor(id: &str, site_id: &str) -> Monitor {
    let mut monitor = Monitor::new(
        id,
        site_id,
        MonitorType::Http {
            url: format!("https://{}.example.com/health", id),
            expected_status: None,
        },
    );
    monitor.check_interval_ms = 60_000;
    monitor.timeout_ms = 5_000;
    monitor
}

/// Monitor that is monitored with the given status
pub fn monitored(id: &str, site_id: &str, status: MonitorStatus) -> Monitor {
    let mut monitor = http_monitor(id, site_id);
    monitor.is_monitoring = true;
    monitor.status = status;
    monitor
}

/// Engine settings with a short timeout buffer
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        timeout_buffer_ms: 50,
        probe_retry_delay_ms: 10,
        backoff: BackoffPolicy::default(),
        ..EngineConfig::default()
    }
}
