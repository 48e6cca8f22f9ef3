use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::RetryQueueStore;
use crate::constants::system;
use crate::error::{LookupError, Result};
use crate::models::{RetryEntry, RetryEntryStatus, RetryEntryUpdate};

const RETRY_COLUMNS: &str = r#"
    id, operation_type, payload, attempts, max_attempts, next_retry_at,
    last_error, status, dead_letter_reason, created_at, updated_at
"#;

/// Retry store over the `retry_queue` table.
///
/// Fetching claims rows: due entries are locked with `FOR UPDATE SKIP LOCKED`
/// and their `next_retry_at` pushed out by the claim timeout in the same
/// statement, so concurrent workers never receive the same entry. A worker
/// that dies mid-batch leaves its entries to reappear once the claim lapses.
#[derive(Debug, Clone)]
pub struct PgRetryQueueStore {
    pool: PgPool,
    claim_timeout: Duration,
}

impl PgRetryQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            claim_timeout: Duration::from_secs(system::DEFAULT_RETRY_CLAIM_TIMEOUT_SECONDS),
        }
    }

    pub fn with_claim_timeout(mut self, claim_timeout: Duration) -> Self {
        self.claim_timeout = claim_timeout;
        self
    }
}

fn ensure_updated(rows_affected: u64, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(LookupError::NotFound {
            entity: "retry entry",
            id: id.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl RetryQueueStore for PgRetryQueueStore {
    async fn enqueue(&self, entry: RetryEntry) -> Result<RetryEntry> {
        let sql = format!(
            r#"
            INSERT INTO retry_queue (
                id, operation_type, payload, attempts, max_attempts,
                next_retry_at, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {RETRY_COLUMNS}
            "#
        );

        let stored = sqlx::query_as::<_, RetryEntry>(&sql)
            .bind(entry.id)
            .bind(&entry.operation_type)
            .bind(&entry.payload)
            .bind(entry.attempts)
            .bind(entry.max_attempts)
            .bind(entry.next_retry_at)
            .bind(&entry.status)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn get_pending_entries(&self, batch_size: u32) -> Result<Vec<RetryEntry>> {
        let sql = format!(
            r#"
            WITH due AS (
                SELECT id AS due_id
                FROM retry_queue
                WHERE status = $1 AND next_retry_at <= NOW()
                ORDER BY next_retry_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE retry_queue
            SET next_retry_at = NOW() + make_interval(secs => $3),
                updated_at = NOW()
            FROM due
            WHERE retry_queue.id = due.due_id
            RETURNING {RETRY_COLUMNS}
            "#
        );

        let mut entries = sqlx::query_as::<_, RetryEntry>(&sql)
            .bind(RetryEntryStatus::Pending.as_str())
            .bind(i64::from(batch_size))
            .bind(self.claim_timeout.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;

        // RETURNING order is unspecified
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn update_entry(&self, id: Uuid, update: &RetryEntryUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE retry_queue
            SET attempts = $2,
                status = $3,
                next_retry_at = COALESCE($4, next_retry_at),
                last_error = COALESCE($5, last_error),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.attempts)
        .bind(update.status.as_str())
        .bind(update.next_retry_at)
        .bind(&update.last_error)
        .execute(&self.pool)
        .await?;

        ensure_updated(result.rows_affected(), id)
    }

    async fn move_to_dead_letter(&self, id: Uuid, reason: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE retry_queue
            SET status = $2, dead_letter_reason = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(RetryEntryStatus::DeadLetter.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        ensure_updated(result.rows_affected(), id)
    }
}
