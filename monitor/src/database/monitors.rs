//! Site and monitor database operations.
//!
//! Pool-level methods serve the facade and the API. The associated functions
//! taking a `SqliteConnection` run inside a caller-owned transaction.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use super::records::{MonitorState, SiteRecord};
use super::Database;
use crate::errors::{MonitorError, MonitorResult};
use crate::types::{LastResult, Monitor, MonitorStatus, MonitorType};

const MONITOR_COLUMNS: &str = r#"
    id, site_id, type, config_json, check_interval_ms, timeout_ms, retry_attempts,
    is_monitoring, status, last_result_json, active_operations_json
"#;

fn decode_error(column: &str, reason: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: reason.into(),
    }
}

fn parse_status(raw: &str) -> MonitorResult<MonitorStatus> {
    raw.parse::<MonitorStatus>()
        .map_err(|reason| MonitorError::Database(decode_error("status", reason)))
}

fn monitor_from_row(row: &SqliteRow) -> MonitorResult<Monitor> {
    let config_json: String = row.try_get("config_json")?;
    let monitor_type: MonitorType = serde_json::from_str(&config_json)?;
    let status: String = row.try_get("status")?;
    let last_result_json: Option<String> = row.try_get("last_result_json")?;
    let last_result: Option<LastResult> = match last_result_json {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    let active_json: String = row.try_get("active_operations_json")?;
    let check_interval_ms: i64 = row.try_get("check_interval_ms")?;
    let timeout_ms: i64 = row.try_get("timeout_ms")?;
    let retry_attempts: i64 = row.try_get("retry_attempts")?;

    Ok(Monitor {
        id: row.try_get("id")?,
        site_id: row.try_get("site_id")?,
        monitor_type,
        check_interval_ms: check_interval_ms.max(0) as u64,
        timeout_ms: timeout_ms.max(0) as u64,
        retry_attempts: retry_attempts.max(0) as u32,
        is_monitoring: row.try_get("is_monitoring")?,
        status: parse_status(&status)?,
        last_result,
        active_operations: serde_json::from_str(&active_json)?,
    })
}

impl Database {
    pub async fn upsert_site(&self, site: &SiteRecord) -> MonitorResult<()> {
        debug!("Upserting site: {}", site.id);

        sqlx::query(
            r#"
            INSERT INTO sites (id, name) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(&site.id)
        .bind(&site.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_site(&self, site_id: &str) -> MonitorResult<Option<SiteRecord>> {
        let row = sqlx::query("SELECT id, name FROM sites WHERE id = ?")
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(SiteRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn list_sites(&self) -> MonitorResult<Vec<SiteRecord>> {
        let rows = sqlx::query("SELECT id, name FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut sites = Vec::with_capacity(rows.len());
        for row in rows {
            sites.push(SiteRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            });
        }
        Ok(sites)
    }

    /// Insert a brand new monitor. Fails if the id is taken.
    pub async fn insert_monitor(&self, monitor: &Monitor) -> MonitorResult<()> {
        debug!("Inserting monitor: {}", monitor.id);

        let result = sqlx::query(
            r#"
            INSERT INTO monitors (
                id, site_id, type, config_json, check_interval_ms, timeout_ms,
                retry_attempts, is_monitoring, status, last_result_json, active_operations_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '[]')
            "#,
        )
        .bind(&monitor.id)
        .bind(&monitor.site_id)
        .bind(monitor.monitor_type.type_name())
        .bind(serde_json::to_string(&monitor.monitor_type)?)
        .bind(monitor.check_interval_ms as i64)
        .bind(monitor.timeout_ms as i64)
        .bind(monitor.retry_attempts as i64)
        .bind(monitor.is_monitoring)
        .bind(monitor.status.as_str())
        .bind(
            monitor
                .last_result
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            error!("Failed to insert monitor {}: {}", monitor.id, e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Upsert the definition columns of a monitor loaded from configuration.
    /// Runtime columns (status, monitoring flag, last result, active operations)
    /// are only written for new rows.
    pub async fn sync_monitor_definition(&self, monitor: &Monitor) -> MonitorResult<()> {
        debug!("Syncing monitor definition: {}", monitor.id);

        sqlx::query(
            r#"
            INSERT INTO monitors (
                id, site_id, type, config_json, check_interval_ms, timeout_ms,
                retry_attempts, is_monitoring, status, active_operations_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]')
            ON CONFLICT(id) DO UPDATE SET
                site_id = excluded.site_id,
                type = excluded.type,
                config_json = excluded.config_json,
                check_interval_ms = excluded.check_interval_ms,
                timeout_ms = excluded.timeout_ms,
                retry_attempts = excluded.retry_attempts
            "#,
        )
        .bind(&monitor.id)
        .bind(&monitor.site_id)
        .bind(monitor.monitor_type.type_name())
        .bind(serde_json::to_string(&monitor.monitor_type)?)
        .bind(monitor.check_interval_ms as i64)
        .bind(monitor.timeout_ms as i64)
        .bind(monitor.retry_attempts as i64)
        .bind(monitor.is_monitoring)
        .bind(monitor.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_monitor(&self, monitor_id: &str) -> MonitorResult<Option<Monitor>> {
        let sql = format!("SELECT {} FROM monitors WHERE id = ?", MONITOR_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(monitor_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(monitor_from_row).transpose()
    }

    pub async fn list_monitors(&self, site_id: Option<&str>) -> MonitorResult<Vec<Monitor>> {
        let rows = match site_id {
            Some(site_id) => {
                let sql = format!(
                    "SELECT {} FROM monitors WHERE site_id = ? ORDER BY id",
                    MONITOR_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(site_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {} FROM monitors ORDER BY id", MONITOR_COLUMNS);
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(monitor_from_row).collect()
    }

    /// Set `is_monitoring` and move a paused monitor back to pending
    pub async fn mark_monitoring_started(&self, monitor_id: &str) -> MonitorResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE monitors
            SET is_monitoring = 1,
                status = CASE WHEN status = 'paused' THEN 'pending' ELSE status END
            WHERE id = ?
            "#,
        )
        .bind(monitor_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clear `is_monitoring` and mark the monitor paused
    pub async fn mark_monitoring_stopped(&self, monitor_id: &str) -> MonitorResult<bool> {
        let result = sqlx::query(
            "UPDATE monitors SET is_monitoring = 0, status = 'paused' WHERE id = ?",
        )
        .bind(monitor_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_monitoring(&self) -> MonitorResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM monitors WHERE is_monitoring = 1")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as usize)
    }

    /// Record an operation id on the monitor row before the probe runs
    pub async fn add_active_operation(
        &self,
        monitor_id: &str,
        operation_id: &str,
    ) -> MonitorResult<()> {
        let mut tx = self.begin().await?;

        let row = sqlx::query("SELECT active_operations_json FROM monitors WHERE id = ?")
            .bind(monitor_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(MonitorError::not_found(monitor_id));
        };

        let json: String = row.try_get("active_operations_json")?;
        let mut active: Vec<String> = serde_json::from_str(&json)?;
        if !active.iter().any(|id| id == operation_id) {
            active.push(operation_id.to_string());
        }
        Self::set_active_operations(&mut tx, monitor_id, &active).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Drop persisted operation ids that the registry no longer knows about.
    /// Returns the number of ids removed.
    pub async fn reconcile_active_operations(
        &self,
        registered: &HashSet<String>,
    ) -> MonitorResult<u32> {
        let mut tx = self.begin().await?;

        let rows = sqlx::query(
            "SELECT id, active_operations_json FROM monitors WHERE active_operations_json != '[]'",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut cleared = 0u32;
        for row in rows {
            let monitor_id: String = row.try_get("id")?;
            let json: String = row.try_get("active_operations_json")?;
            let active: Vec<String> = serde_json::from_str(&json)?;

            let (kept, stale): (Vec<String>, Vec<String>) =
                active.into_iter().partition(|id| registered.contains(id));
            if stale.is_empty() {
                continue;
            }

            warn!(
                "Clearing {} stale operation id(s) from monitor {}",
                stale.len(),
                monitor_id
            );
            cleared += stale.len() as u32;
            Self::set_active_operations(&mut tx, &monitor_id, &kept).await?;
        }

        tx.commit().await?;
        Ok(cleared)
    }

    /// Delete a site together with its monitors and their history.
    /// Returns the number of monitors removed.
    pub async fn delete_site(&self, site_id: &str) -> MonitorResult<u64> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query("SELECT id FROM sites WHERE id = ?")
            .bind(site_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(MonitorError::SiteNotFound {
                site_id: site_id.to_string(),
            });
        }

        let history = sqlx::query(
            "DELETE FROM history WHERE monitor_id IN (SELECT id FROM monitors WHERE site_id = ?)",
        )
        .bind(site_id)
        .execute(&mut *tx)
        .await?;

        let monitors = sqlx::query("DELETE FROM monitors WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            "Deleted site {} ({} monitors, {} history rows)",
            site_id,
            monitors.rows_affected(),
            history.rows_affected()
        );
        Ok(monitors.rows_affected())
    }

    /// Read the columns the status update decision depends on
    pub async fn load_monitor_state(
        conn: &mut SqliteConnection,
        monitor_id: &str,
    ) -> MonitorResult<Option<MonitorState>> {
        let row = sqlx::query(
            "SELECT site_id, status, is_monitoring, active_operations_json FROM monitors WHERE id = ?",
        )
        .bind(monitor_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let active_json: String = row.try_get("active_operations_json")?;
        Ok(Some(MonitorState {
            site_id: row.try_get("site_id")?,
            status: parse_status(&status)?,
            is_monitoring: row.try_get("is_monitoring")?,
            active_operations: serde_json::from_str(&active_json)?,
        }))
    }

    /// Write status and last result, only while the monitor is still monitored.
    /// Returns false when the row was paused in the meantime.
    pub async fn write_status(
        conn: &mut SqliteConnection,
        monitor_id: &str,
        status: MonitorStatus,
        last_result: &LastResult,
    ) -> MonitorResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE monitors
            SET status = ?, last_result_json = ?
            WHERE id = ? AND is_monitoring = 1
            "#,
        )
        .bind(status.as_str())
        .bind(serde_json::to_string(last_result)?)
        .bind(monitor_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write only the last result, leaving status alone
    pub async fn write_last_result(
        conn: &mut SqliteConnection,
        monitor_id: &str,
        last_result: &LastResult,
    ) -> MonitorResult<()> {
        sqlx::query("UPDATE monitors SET last_result_json = ? WHERE id = ?")
            .bind(serde_json::to_string(last_result)?)
            .bind(monitor_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn set_active_operations(
        conn: &mut SqliteConnection,
        monitor_id: &str,
        operation_ids: &[String],
    ) -> MonitorResult<()> {
        sqlx::query("UPDATE monitors SET active_operations_json = ? WHERE id = ?")
            .bind(serde_json::to_string(operation_ids)?)
            .bind(monitor_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
