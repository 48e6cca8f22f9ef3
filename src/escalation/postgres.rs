//! Postgres escalation repository over `manual_escalation_queue`.
//!
//! Status changes are compare-and-set updates (`WHERE status = $from`), so two
//! researchers claiming the same entry cannot both win.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::EscalationRepository;
use crate::error::Result;
use crate::models::{EscalationEntry, EscalationResolution, EscalationStatus};

const ESCALATION_COLUMNS: &str = r#"
    id, vin, glass_positions, vehicle_snapshot, transaction_id, customer_context,
    priority, priority_rank, attempt_log, status,
    resolved_nags_number, resolved_by, resolution_source, resolution_notes, resolved_at,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgEscalationRepository {
    pool: PgPool,
}

impl PgEscalationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EscalationRepository for PgEscalationRepository {
    async fn insert(&self, entry: EscalationEntry) -> Result<EscalationEntry> {
        let sql = format!(
            r#"
            INSERT INTO manual_escalation_queue (
                id, vin, glass_positions, vehicle_snapshot, transaction_id, customer_context,
                priority, priority_rank, attempt_log, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ESCALATION_COLUMNS}
            "#
        );

        let stored = sqlx::query_as::<_, EscalationEntry>(&sql)
            .bind(entry.id)
            .bind(&entry.vin)
            .bind(&entry.glass_positions)
            .bind(&entry.vehicle_snapshot)
            .bind(&entry.transaction_id)
            .bind(&entry.customer_context)
            .bind(&entry.priority)
            .bind(entry.priority_rank)
            .bind(&entry.attempt_log)
            .bind(&entry.status)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn find(&self, id: Uuid) -> Result<Option<EscalationEntry>> {
        let sql = format!("SELECT {ESCALATION_COLUMNS} FROM manual_escalation_queue WHERE id = $1");
        let entry = sqlx::query_as::<_, EscalationEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn pending(&self, limit: i64) -> Result<Vec<EscalationEntry>> {
        let sql = format!(
            r#"
            SELECT {ESCALATION_COLUMNS}
            FROM manual_escalation_queue
            WHERE status = $1
            ORDER BY priority_rank DESC, created_at ASC
            LIMIT $2
            "#
        );
        let entries = sqlx::query_as::<_, EscalationEntry>(&sql)
            .bind(EscalationStatus::Pending.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn transition(&self, id: Uuid, from: EscalationStatus, to: EscalationStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE manual_escalation_queue
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn resolve(
        &self,
        id: Uuid,
        from: EscalationStatus,
        resolution: &EscalationResolution,
    ) -> Result<Option<EscalationEntry>> {
        let sql = format!(
            r#"
            UPDATE manual_escalation_queue
            SET status = $3,
                resolved_nags_number = $4,
                resolved_by = $5,
                resolution_source = $6,
                resolution_notes = $7,
                resolved_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ESCALATION_COLUMNS}
            "#
        );

        let entry = sqlx::query_as::<_, EscalationEntry>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(EscalationStatus::Resolved.as_str())
            .bind(&resolution.resolved_nags_number)
            .bind(&resolution.resolved_by)
            .bind(&resolution.resolution_source)
            .bind(&resolution.resolution_notes)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }
}
