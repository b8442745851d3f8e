use super::mappers::{action_from_row, columns_from_action};
use super::rows::QueuedActionRow;
use crate::application::ports::action_log::{ActionLog, CorruptEntry, LogScan};
use crate::domain::entities::QueuedAction;
use crate::domain::value_objects::QueuedActionId;
use crate::shared::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

/// `ActionLog` backed by the `sync_queue` table.
pub struct SqliteActionLog {
    pool: Pool<Sqlite>,
}

impl SqliteActionLog {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionLog for SqliteActionLog {
    async fn append(&self, action: &QueuedAction) -> Result<QueuedActionId> {
        let columns = columns_from_action(action)?;

        sqlx::query(
            r#"
            INSERT INTO sync_queue (
                action_id, action_type, payload, created_at,
                retry_count, last_error, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&columns.action_id)
        .bind(columns.action_type)
        .bind(&columns.payload)
        .bind(&columns.created_at)
        .bind(columns.retry_count)
        .bind(&columns.last_error)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            target: "sync::log",
            action_id = %action.id,
            action_type = columns.action_type,
            "queued action persisted"
        );

        Ok(action.id.clone())
    }

    async fn scan(&self) -> Result<LogScan> {
        let rows = sqlx::query_as::<_, QueuedActionRow>(
            r#"
            SELECT action_id, action_type, payload, created_at, retry_count, last_error
            FROM sync_queue
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scan = LogScan::default();
        for row in rows {
            let action_id = row.action_id.clone();
            let action_type = row.action_type.clone();
            match action_from_row(row) {
                Ok(action) => scan.actions.push(action),
                Err(err) => {
                    tracing::warn!(
                        target: "sync::log",
                        action_id = %action_id,
                        action_type = %action_type,
                        error = %err,
                        "queued action could not be decoded"
                    );
                    scan.corrupt.push(CorruptEntry {
                        action_id,
                        action_type,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(scan)
    }

    async fn remove(&self, id: &QueuedActionId) -> Result<()> {
        let result = sqlx::query("DELETE FROM sync_queue WHERE action_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::trace!(target: "sync::log", action_id = %id, "remove on missing action");
        }
        Ok(())
    }

    async fn discard_corrupt(&self, entry: &CorruptEntry) -> Result<()> {
        sqlx::query("DELETE FROM sync_queue WHERE action_id = ?1")
            .bind(&entry.action_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, action: &QueuedAction) -> Result<()> {
        let columns = columns_from_action(action)?;

        let result = sqlx::query(
            r#"
            UPDATE sync_queue
            SET retry_count = ?1, last_error = ?2, payload = ?3, updated_at = ?4
            WHERE action_id = ?5
            "#,
        )
        .bind(columns.retry_count)
        .bind(&columns.last_error)
        .bind(&columns.payload)
        .bind(Utc::now().timestamp_millis())
        .bind(&columns.action_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Queued action {} is not in the log",
                action.id
            )));
        }
        Ok(())
    }

    async fn size(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sync_queue")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
