//! Log Repository
//!
//! Storage for the log lines reported by executors for a run.

use std::collections::HashMap;

use async_trait::async_trait;
use otto_core::domain::log::{LogLevel, LogLine};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::StoreResult;

/// Storage port for run logs
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, run_id: Uuid, lines: Vec<LogLine>) -> StoreResult<()>;

    /// All lines of a run in timestamp order
    async fn find_by_run(&self, run_id: Uuid) -> StoreResult<Vec<LogLine>>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    lines: RwLock<HashMap<Uuid, Vec<LogLine>>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, run_id: Uuid, lines: Vec<LogLine>) -> StoreResult<()> {
        self.lines
            .write()
            .await
            .entry(run_id)
            .or_default()
            .extend(lines);
        Ok(())
    }

    async fn find_by_run(&self, run_id: Uuid) -> StoreResult<Vec<LogLine>> {
        let mut lines = self
            .lines
            .read()
            .await
            .get(&run_id)
            .cloned()
            .unwrap_or_default();
        // Stable, so lines sharing a timestamp keep their append order
        lines.sort_by_key(|l| l.timestamp);
        Ok(lines)
    }
}

// =============================================================================
// Postgres implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, run_id: Uuid, lines: Vec<LogLine>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO run_logs (run_id, timestamp, level, message, source)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(run_id)
            .bind(line.timestamp)
            .bind(line.level.as_str())
            .bind(&line.message)
            .bind(&line.source)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_run(&self, run_id: Uuid) -> StoreResult<Vec<LogLine>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT timestamp, level, message, source
            FROM run_logs
            WHERE run_id = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LogRow {
    timestamp: chrono::DateTime<chrono::Utc>,
    level: String,
    message: String,
    source: Option<String>,
}

impl From<LogRow> for LogLine {
    fn from(row: LogRow) -> Self {
        LogLine {
            timestamp: row.timestamp,
            level: row.level.parse().unwrap_or(LogLevel::Info),
            message: row.message,
            source: row.source,
        }
    }
}
