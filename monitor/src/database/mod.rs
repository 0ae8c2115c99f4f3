//! Database layer for the monitor engine.
//!
//! This module provides SQLite persistence for:
//! - Sites and their monitors (definition + runtime status)
//! - Check history (append-only, pruned to a retention limit)
//! - Active operation ids per monitor, used to reconcile after a restart
//!
//! The module is organized into submodules:
//! - `records` - Row types that are not core domain types
//! - `monitors` - Site and monitor CRUD plus transaction helpers
//! - `history` - History inserts, pruning and queries

mod history;
mod monitors;
mod records;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tracing::{error, info};

use crate::constants::database::{BUSY_TIMEOUT, MAX_CONNECTIONS};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Expose pool for integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Opening database at {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Failed to create parent directory {:?}: {}", parent, e);
                return Err(e.into());
            }
        }

        // WAL keeps readers off the writer's lock; writers queue on busy_timeout
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = match SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to database {}: {}", database_path, e);
                return Err(e.into());
            }
        };

        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection that is never recycled,
    /// otherwise SQLite would hand out a fresh empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let database = Self { pool };
        database.initialize_tables().await?;
        info!("Database tables initialized");
        Ok(database)
    }

    /// Start a write transaction. Everything that must commit together shares it.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front. A deferred transaction
    /// that reads first and upgrades later fails with SQLITE_BUSY instead of
    /// waiting when another connection is writing.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    async fn initialize_tables(&self) -> Result<()> {
        let statements = [
            (
                "sites",
                r#"
                CREATE TABLE IF NOT EXISTS sites (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL
                )
                "#,
            ),
            (
                "monitors",
                r#"
                CREATE TABLE IF NOT EXISTS monitors (
                    id TEXT PRIMARY KEY,
                    site_id TEXT NOT NULL REFERENCES sites(id),
                    type TEXT NOT NULL,
                    config_json TEXT NOT NULL,
                    check_interval_ms INTEGER NOT NULL,
                    timeout_ms INTEGER NOT NULL,
                    retry_attempts INTEGER NOT NULL,
                    is_monitoring BOOLEAN NOT NULL DEFAULT 0,
                    status TEXT NOT NULL DEFAULT 'pending',
                    last_result_json TEXT,
                    active_operations_json TEXT NOT NULL DEFAULT '[]'
                )
                "#,
            ),
            (
                "monitors site index",
                "CREATE INDEX IF NOT EXISTS idx_monitors_site ON monitors(site_id)",
            ),
            (
                "history",
                r#"
                CREATE TABLE IF NOT EXISTS history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    monitor_id TEXT NOT NULL REFERENCES monitors(id),
                    timestamp DATETIME NOT NULL,
                    status TEXT NOT NULL,
                    response_time_ms INTEGER NOT NULL,
                    details TEXT,
                    error TEXT
                )
                "#,
            ),
            (
                "history index",
                "CREATE INDEX IF NOT EXISTS idx_history_monitor_timestamp ON history(monitor_id, timestamp DESC)",
            ),
        ];

        for (name, sql) in statements {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                error!("Failed to create {}: {}", name, e);
                return Err(e.into());
            }
        }

        Ok(())
    }
}
