//! Monitor domain types shared by the engine, the database layer and the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::limits;
use crate::errors::MonitorError;

/// Persisted monitor status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Pending => "pending",
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MonitorStatus::Pending),
            "up" => Ok(MonitorStatus::Up),
            "down" => Ok(MonitorStatus::Down),
            "paused" => Ok(MonitorStatus::Paused),
            other => Err(format!("unknown monitor status '{}'", other)),
        }
    }
}

/// Outcome status of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Up,
    Down,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Up => "up",
            CheckStatus::Down => "down",
        }
    }
}

impl From<CheckStatus> for MonitorStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Up => MonitorStatus::Up,
            CheckStatus::Down => MonitorStatus::Down,
        }
    }
}

impl FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(CheckStatus::Up),
            "down" => Ok(CheckStatus::Down),
            other => Err(format!("unknown check status '{}'", other)),
        }
    }
}

/// What triggered a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// User asked for a point-in-time answer; never skipped
    Manual,
    /// Timer driven; skipped while another check for the monitor is outstanding
    Scheduled,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Manual => f.write_str("manual"),
            CheckKind::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Raw executor output, never stored directly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub response_time_ms: u64,
    pub details: Option<String>,
    pub error: Option<String>,
}

impl CheckResult {
    pub fn up(response_time_ms: u64, details: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Up,
            response_time_ms,
            details: Some(details.into()),
            error: None,
        }
    }

    pub fn down(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Down,
            response_time_ms,
            details: None,
            error: Some(error.into()),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == CheckStatus::Up
    }
}

/// Summary of the latest recorded check, stored on the monitor row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastResult {
    pub status: CheckStatus,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
    pub details: Option<String>,
    pub error: Option<String>,
}

impl LastResult {
    pub fn from_check(result: &CheckResult, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: result.status,
            response_time_ms: result.response_time_ms,
            checked_at,
            details: result.details.clone(),
            error: result.error.clone(),
        }
    }
}

/// How a composite monitor folds its member results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    #[default]
    All,
    Any,
}

/// Probe definition, one variant per monitor type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorType {
    Http {
        url: String,
        #[serde(default)]
        expected_status: Option<u16>,
    },
    Port {
        host: String,
        port: u16,
    },
    Ping {
        host: String,
    },
    Dns {
        hostname: String,
        #[serde(default)]
        expected_address: Option<IpAddr>,
    },
    Ssl {
        host: String,
        #[serde(default = "default_tls_port")]
        port: u16,
    },
    Composite {
        checks: Vec<MonitorType>,
        #[serde(default)]
        mode: CompositeMode,
    },
}

fn default_tls_port() -> u16 {
    443
}

impl MonitorType {
    /// Name stored in the `type` column
    pub fn type_name(&self) -> &'static str {
        match self {
            MonitorType::Http { .. } => "http",
            MonitorType::Port { .. } => "port",
            MonitorType::Ping { .. } => "ping",
            MonitorType::Dns { .. } => "dns",
            MonitorType::Ssl { .. } => "ssl",
            MonitorType::Composite { .. } => "composite",
        }
    }

    /// Short human description of the probe target
    pub fn target(&self) -> String {
        match self {
            MonitorType::Http { url, .. } => url.clone(),
            MonitorType::Port { host, port } => format!("{}:{}", host, port),
            MonitorType::Ping { host } => host.clone(),
            MonitorType::Dns { hostname, .. } => hostname.clone(),
            MonitorType::Ssl { host, port } => format!("{}:{}", host, port),
            MonitorType::Composite { checks, .. } => format!("{} checks", checks.len()),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            MonitorType::Http {
                url,
                expected_status,
            } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("url '{}' must start with http:// or https://", url));
                }
                if let Some(code) = expected_status {
                    if !(100..=599).contains(code) {
                        return Err(format!("expected_status {} is not an HTTP status", code));
                    }
                }
                Ok(())
            }
            MonitorType::Port { host, port } => {
                require_host(host)?;
                if *port == 0 {
                    return Err("port must be between 1 and 65535".to_string());
                }
                Ok(())
            }
            MonitorType::Ping { host } => require_host(host),
            MonitorType::Dns { hostname, .. } => require_host(hostname),
            MonitorType::Ssl { host, port } => {
                require_host(host)?;
                if *port == 0 {
                    return Err("port must be between 1 and 65535".to_string());
                }
                Ok(())
            }
            MonitorType::Composite { checks, .. } => {
                if checks.is_empty() {
                    return Err("composite monitor needs at least one check".to_string());
                }
                checks.iter().try_for_each(|check| check.validate())
            }
        }
    }
}

fn require_host(host: &str) -> Result<(), String> {
    if host.trim().is_empty() || host.contains(char::is_whitespace) {
        return Err(format!("host '{}' is not valid", host));
    }
    Ok(())
}

/// A monitored endpoint together with its runtime state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub site_id: String,
    pub monitor_type: MonitorType,
    pub check_interval_ms: u64,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub is_monitoring: bool,
    pub status: MonitorStatus,
    pub last_result: Option<LastResult>,
    pub active_operations: Vec<String>,
}

impl Monitor {
    /// New monitor in `pending` state that is not yet monitored
    pub fn new(id: &str, site_id: &str, monitor_type: MonitorType) -> Self {
        use crate::constants::defaults;

        Self {
            id: id.to_string(),
            site_id: site_id.to_string(),
            monitor_type,
            check_interval_ms: defaults::CHECK_INTERVAL_MS,
            timeout_ms: defaults::TIMEOUT_MS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            is_monitoring: false,
            status: MonitorStatus::Pending,
            last_result: None,
            active_operations: Vec::new(),
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Boundary validation, run when a monitor is created or loaded from config
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.id.trim().is_empty() {
            return Err(MonitorError::invalid(&self.id, "id must not be empty"));
        }
        if self.site_id.trim().is_empty() {
            return Err(MonitorError::invalid(&self.id, "site_id must not be empty"));
        }
        if self.check_interval_ms < limits::MIN_CHECK_INTERVAL_MS {
            return Err(MonitorError::invalid(
                &self.id,
                format!(
                    "check_interval_ms must be at least {}",
                    limits::MIN_CHECK_INTERVAL_MS
                ),
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > limits::MAX_TIMEOUT_MS {
            return Err(MonitorError::invalid(
                &self.id,
                format!("timeout_ms must be between 1 and {}", limits::MAX_TIMEOUT_MS),
            ));
        }
        if self.retry_attempts > limits::MAX_RETRY_ATTEMPTS {
            return Err(MonitorError::invalid(
                &self.id,
                format!("retry_attempts must not exceed {}", limits::MAX_RETRY_ATTEMPTS),
            ));
        }
        self.monitor_type
            .validate()
            .map_err(|reason| MonitorError::invalid(&self.id, reason))
    }
}
