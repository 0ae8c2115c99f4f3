//! Check history database operations.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::records::HistoryEntry;
use super::Database;
use crate::errors::{MonitorError, MonitorResult};
use crate::types::{CheckResult, CheckStatus};

impl Database {
    /// Append one history row inside the caller's transaction
    pub async fn insert_history(
        conn: &mut SqliteConnection,
        monitor_id: &str,
        result: &CheckResult,
        timestamp: DateTime<Utc>,
    ) -> MonitorResult<i64> {
        let done = sqlx::query(
            r#"
            INSERT INTO history (monitor_id, timestamp, status, response_time_ms, details, error)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(monitor_id)
        .bind(timestamp)
        .bind(result.status.as_str())
        .bind(result.response_time_ms as i64)
        .bind(&result.details)
        .bind(&result.error)
        .execute(&mut *conn)
        .await?;

        Ok(done.last_insert_rowid())
    }

    /// Keep only the newest `limit` rows for a monitor
    pub async fn prune_history(
        conn: &mut SqliteConnection,
        monitor_id: &str,
        limit: u32,
    ) -> MonitorResult<u64> {
        let done = sqlx::query(
            r#"
            DELETE FROM history
            WHERE monitor_id = ?
              AND id NOT IN (
                  SELECT id FROM history
                  WHERE monitor_id = ?
                  ORDER BY timestamp DESC, id DESC
                  LIMIT ?
              )
            "#,
        )
        .bind(monitor_id)
        .bind(monitor_id)
        .bind(limit as i64)
        .execute(&mut *conn)
        .await?;

        if done.rows_affected() > 0 {
            debug!(
                "Pruned {} history row(s) for {}",
                done.rows_affected(),
                monitor_id
            );
        }
        Ok(done.rows_affected())
    }

    /// Newest first
    pub async fn get_history(
        &self,
        monitor_id: &str,
        limit: u32,
    ) -> MonitorResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, monitor_id, timestamp, status, response_time_ms, details, error
            FROM history
            WHERE monitor_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(monitor_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.try_get("status")?;
            let status = status.parse::<CheckStatus>().map_err(|reason| {
                MonitorError::Database(sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: reason.into(),
                })
            })?;
            let response_time_ms: i64 = row.try_get("response_time_ms")?;

            entries.push(HistoryEntry {
                id: row.try_get("id")?,
                monitor_id: row.try_get("monitor_id")?,
                timestamp: row.try_get("timestamp")?,
                status,
                response_time_ms: response_time_ms.max(0) as u64,
                details: row.try_get("details")?,
                error: row.try_get("error")?,
            });
        }
        Ok(entries)
    }

    pub async fn count_history(&self, monitor_id: &str) -> MonitorResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM history WHERE monitor_id = ?")
            .bind(monitor_id)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}
