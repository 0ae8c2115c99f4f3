//! Test database utilities for SQLite testing

use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use monitor::database::{Database, SiteRecord};
use monitor::types::Monitor;

/// Test database wrapper, in memory unless created with `on_disk`
pub struct TestDatabase {
    database: Arc<Database>,
    _dir: Option<TempDir>,
}

impl TestDatabase {
    /// Create a new in-memory test database
    pub async fn new() -> Result<Self> {
        Ok(Self {
            database: Arc::new(Database::in_memory().await?),
            _dir: None,
        })
    }

    /// File-backed database with a connection pool, removed on drop
    pub async fn on_disk() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("monitors.db");
        let database = Database::new(&path.to_string_lossy()).await?;
        Ok(Self {
            database: Arc::new(database),
            _dir: Some(dir),
        })
    }

    pub fn database(&self) -> Arc<Database> {
        self.database.clone()
    }

    pub async fn seed_site(&self, site_id: &str) -> Result<()> {
        self.database
            .upsert_site(&SiteRecord {
                id: site_id.to_string(),
                name: format!("{} site", site_id),
            })
            .await?;
        Ok(())
    }

    /// Insert a monitor, creating its site if needed
    pub async fn seed_monitor(&self, monitor: &Monitor) -> Result<()> {
        if self.database.get_site(&monitor.site_id).await?.is_none() {
            self.seed_site(&monitor.site_id).await?;
        }
        self.database.insert_monitor(monitor).await?;
        Ok(())
    }

    pub async fn monitor(&self, monitor_id: &str) -> Monitor {
        self.database
            .get_monitor(monitor_id)
            .await
            .expect("monitor query failed")
            .expect("monitor missing")
    }

    pub async fn history_count(&self, monitor_id: &str) -> u64 {
        self.database
            .count_history(monitor_id)
            .await
            .expect("history count failed")
    }
}
