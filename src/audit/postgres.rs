use async_trait::async_trait;
use sqlx::PgPool;

use super::LookupLogRepository;
use crate::error::Result;
use crate::models::LookupLogRow;

/// Insert-only repository over `nags_lookup_log`
#[derive(Debug, Clone)]
pub struct PgLookupLogRepository {
    pool: PgPool,
}

impl PgLookupLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LookupLogRepository for PgLookupLogRepository {
    async fn insert(&self, row: &LookupLogRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nags_lookup_log (
                id, vin, requested_positions, transaction_id,
                resolved_by_tier, resolved_by_source,
                cache_ms, distributor_ms, fallback_ms, total_ms,
                success, nags_part_number, error, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(row.id)
        .bind(&row.vin)
        .bind(&row.requested_positions)
        .bind(&row.transaction_id)
        .bind(row.resolved_by_tier)
        .bind(&row.resolved_by_source)
        .bind(row.cache_ms)
        .bind(row.distributor_ms)
        .bind(row.fallback_ms)
        .bind(row.total_ms)
        .bind(row.success)
        .bind(&row.nags_part_number)
        .bind(&row.error)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_for_vin(&self, vin: &str, limit: i64) -> Result<Vec<LookupLogRow>> {
        let rows = sqlx::query_as::<_, LookupLogRow>(
            r#"
            SELECT id, vin, requested_positions, transaction_id,
                   resolved_by_tier, resolved_by_source,
                   cache_ms, distributor_ms, fallback_ms, total_ms,
                   success, nags_part_number, error, created_at
            FROM nags_lookup_log
            WHERE vin = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(vin)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
