//! Database record types (entities) that are not core domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CheckStatus, MonitorStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: String,
    pub name: String,
}

/// Immutable history row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub monitor_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: CheckStatus,
    pub response_time_ms: u64,
    pub details: Option<String>,
    pub error: Option<String>,
}

/// Monitor columns read inside a status-update transaction
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub site_id: String,
    pub status: MonitorStatus,
    pub is_monitoring: bool,
    pub active_operations: Vec<String>,
}
