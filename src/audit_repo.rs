// SQLite audit log of rollout results, one row per target per session.
// Kept for `retention_days`; pruned at startup of each interactive run.

use crate::models::{ResourceId, RolloutOutcome, RolloutResult};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub session_id: i64,
    pub created_at: i64,
    pub target: String,
    pub resource: String,
    pub requested_size: u64,
    pub resulting_size: Option<u64>,
    pub status: String,
    pub error: Option<String>,
}

pub struct AuditRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl AuditRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rollout_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                target TEXT NOT NULL,
                resource TEXT NOT NULL,
                requested_size INTEGER NOT NULL,
                resulting_size INTEGER,
                status TEXT NOT NULL,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_rollout_created_at ON rollout_history(created_at)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes every result of one session in a single transaction.
    #[instrument(skip(self, results), fields(repo = "audit", operation = "record_rollout", results_count = results.len()))]
    pub async fn record_rollout(
        &self,
        session_id: i64,
        created_at: i64,
        resource: &ResourceId,
        results: &[RolloutResult],
    ) -> anyhow::Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for r in results {
            let (status, resulting_size, error) = match &r.outcome {
                RolloutOutcome::Succeeded { resulting_size } => {
                    (STATUS_SUCCEEDED, Some(*resulting_size as i64), None)
                }
                RolloutOutcome::Failed { error } => (STATUS_FAILED, None, Some(error.to_string())),
            };
            sqlx::query(
                "INSERT INTO rollout_history (session_id, created_at, target, resource, requested_size, resulting_size, status, error) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(session_id)
            .bind(created_at)
            .bind(&r.target)
            .bind(resource.to_string())
            .bind(r.requested_size as i64)
            .bind(resulting_size)
            .bind(status)
            .bind(error)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Most recent `limit` records, oldest first.
    pub async fn recent(&self, limit: u32) -> anyhow::Result<Vec<AuditRecord>> {
        let rows = sqlx::query(
            "SELECT session_id, created_at, target, resource, requested_size, resulting_size, status, error
             FROM rollout_history ORDER BY id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(AuditRecord {
                session_id: row.try_get("session_id")?,
                created_at: row.try_get("created_at")?,
                target: row.try_get("target")?,
                resource: row.try_get("resource")?,
                requested_size: row.try_get::<i64, _>("requested_size")? as u64,
                resulting_size: row
                    .try_get::<Option<i64>, _>("resulting_size")?
                    .map(|v| v as u64),
                status: row.try_get("status")?,
                error: row.try_get("error")?,
            });
        }
        out.reverse();
        Ok(out)
    }

    /// Deletes records older than the retention window. Returns rows removed.
    #[instrument(skip(self), fields(repo = "audit", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> anyhow::Result<u64> {
        let cutoff = now_ms()? - self.retention_ms;
        let r = sqlx::query("DELETE FROM rollout_history WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }
}

pub fn now_ms() -> anyhow::Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64)
}
