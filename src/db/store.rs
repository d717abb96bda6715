use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::NotifyError;

/// A job whose OpsLevel notification is owned by a pipeline notify step
#[derive(Debug, Clone, Serialize, PartialEq, Eq, FromRow)]
pub struct SuppressionMarker {
    pub job_name: String,
    pub marked_at: DateTime<Utc>,
}

/// Persistent per-job suppression markers in SQLite
#[derive(Clone)]
pub struct SqlMarkerStore {
    pool: SqlitePool,
}

impl SqlMarkerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether `job_name` has been taken over by a pipeline notify step
    pub async fn is_marked(&self, job_name: &str) -> Result<bool, NotifyError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT job_name FROM suppression_markers WHERE job_name = ?")
                .bind(job_name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    NotifyError::DatabaseError(format!("Failed to look up marker: {}", e))
                })?;

        Ok(row.is_some())
    }

    /// Mark `job_name`. Marking twice keeps the original timestamp.
    pub async fn mark(&self, job_name: &str) -> Result<(), NotifyError> {
        sqlx::query(
            r#"
            INSERT INTO suppression_markers (job_name, marked_at)
            VALUES (?, ?)
            ON CONFLICT(job_name) DO NOTHING
            "#,
        )
        .bind(job_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| NotifyError::DatabaseError(format!("Failed to set marker: {}", e)))?;

        Ok(())
    }

    /// Release `job_name` back to the automatic notifier. Returns whether a marker existed.
    pub async fn clear(&self, job_name: &str) -> Result<bool, NotifyError> {
        let result = sqlx::query("DELETE FROM suppression_markers WHERE job_name = ?")
            .bind(job_name)
            .execute(&self.pool)
            .await
            .map_err(|e| NotifyError::DatabaseError(format!("Failed to clear marker: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<SuppressionMarker>, NotifyError> {
        sqlx::query_as::<_, SuppressionMarker>(
            "SELECT job_name, marked_at FROM suppression_markers ORDER BY job_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NotifyError::DatabaseError(format!("Failed to list markers: {}", e)))
    }

    pub async fn count(&self) -> Result<i64, NotifyError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM suppression_markers")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NotifyError::DatabaseError(format!("Failed to count markers: {}", e)))?;

        Ok(count)
    }
}
