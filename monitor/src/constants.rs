//! Central repository for engine constants
//!
//! Timeouts, limits and defaults grouped by the component that uses them.

#![allow(dead_code)]

use std::time::Duration;

/// Operation registry limits
pub mod operations {
    /// Attempts at generating an unused operation id before giving up
    pub const MAX_ID_ATTEMPTS: u32 = 5;

    /// Minutes a cancelled operation may linger before the reaper removes it
    pub const REAP_AFTER_MINUTES: i64 = 30;

    /// Interval of the background reaper loop
    pub const REAP_INTERVAL_SECONDS: u64 = 300;
}

/// Timeout manager settings
pub mod timeouts {
    use super::Duration;

    /// Added to every monitor timeout so the executor's own timeout fires first
    pub const DEFAULT_BUFFER: Duration = Duration::from_millis(5_000);
}

/// SQLite connection settings
pub mod database {
    use super::Duration;

    /// How long a writer waits for the lock before SQLITE_BUSY
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

    pub const MAX_CONNECTIONS: u32 = 8;
}

/// Probe execution settings
pub mod probes {
    use super::Duration;

    /// Pause between internal probe retries
    pub const RETRY_DELAY: Duration = Duration::from_millis(500);

    /// HTTP statuses below this are considered up when no expected status is set
    pub const HTTP_SUCCESS_CEILING: u16 = 400;
}

/// Default configuration values
pub mod defaults {
    pub const CHECK_INTERVAL_MS: u64 = 300_000;

    pub const TIMEOUT_MS: u64 = 10_000;

    pub const RETRY_ATTEMPTS: u32 = 3;

    /// History rows kept per monitor
    pub const HISTORY_RETENTION_LIMIT: u32 = 1_000;

    pub const BACKOFF_FAILURE_THRESHOLD: u32 = 1;

    pub const BACKOFF_MULTIPLIER: u32 = 2;

    pub const BACKOFF_MAX_MULTIPLIER: u32 = 4;

    pub const DATABASE_PATH: &str = "data/monitors.db";
}

/// Validation limits applied when monitors are created or loaded
pub mod limits {
    pub const MIN_CHECK_INTERVAL_MS: u64 = 1_000;

    pub const MAX_TIMEOUT_MS: u64 = 300_000;

    pub const MAX_RETRY_ATTEMPTS: u32 = 10;

    /// Upper bound for `?limit=` on history queries
    pub const MAX_HISTORY_PAGE: u32 = 1_000;
}
