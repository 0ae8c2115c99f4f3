//! Error types for the monitor check engine
//!
//! Probe failures are not errors here: a probe that cannot reach its target
//! produces a `down` result. These types cover the conditions the engine
//! itself has to surface to its caller.

use thiserror::Error;

/// Main error type for the check engine
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Monitor row does not exist
    #[error("Monitor '{monitor_id}' not found")]
    MonitorNotFound { monitor_id: String },

    /// Site row does not exist
    #[error("Site '{site_id}' not found")]
    SiteNotFound { site_id: String },

    /// Operation id generator kept colliding with active ids
    #[error(
        "Could not allocate a unique operation id for monitor '{monitor_id}' after {attempts} attempts"
    )]
    OperationCollision { monitor_id: String, attempts: u32 },

    /// Monitor definition rejected at the boundary
    #[error("Invalid monitor '{monitor_id}': {reason}")]
    InvalidMonitor { monitor_id: String, reason: String },

    /// Storage failure (connection, constraint, transaction)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON columns could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    pub fn not_found(monitor_id: &str) -> Self {
        MonitorError::MonitorNotFound {
            monitor_id: monitor_id.to_string(),
        }
    }

    pub fn invalid(monitor_id: &str, reason: impl Into<String>) -> Self {
        MonitorError::InvalidMonitor {
            monitor_id: monitor_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a check executor that are not plain probe failures
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Cancellation was observed before the probe finished
    #[error("Check cancelled before completion")]
    Cancelled,

    /// Executor has no implementation for this monitor type
    #[error("No probe available for monitor type '{0}'")]
    Unsupported(String),

    /// Target could not be turned into something probeable
    #[error("Invalid probe target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
