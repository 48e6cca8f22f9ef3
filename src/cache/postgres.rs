//! Postgres cache repository over the `nags_parts_cache` table.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::PartsCacheRepository;
use crate::error::Result;
use crate::models::{CacheStats, CachedPart, GlassPosition, NewCachedPart};

const CACHED_PART_COLUMNS: &str = r#"
    id, vin_pattern, glass_position, year, make, model,
    nags_part_number, nags_part_number_alt, features,
    price_cost, price_source, price_as_of, description,
    source, confidence, verified, lookup_count, last_lookup_at,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgPartsCacheRepository {
    pool: PgPool,
}

impl PgPartsCacheRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PartsCacheRepository for PgPartsCacheRepository {
    async fn find(&self, vin_pattern: &str, position: GlassPosition) -> Result<Option<CachedPart>> {
        let sql = format!(
            "SELECT {CACHED_PART_COLUMNS} FROM nags_parts_cache WHERE vin_pattern = $1 AND glass_position = $2"
        );
        let row = sqlx::query_as::<_, CachedPart>(&sql)
            .bind(vin_pattern)
            .bind(position.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn record_hit(&self, vin_pattern: &str, position: GlassPosition) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE nags_parts_cache
            SET lookup_count = lookup_count + 1,
                last_lookup_at = NOW()
            WHERE vin_pattern = $1 AND glass_position = $2
            "#,
        )
        .bind(vin_pattern)
        .bind(position.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, record: NewCachedPart) -> Result<CachedPart> {
        let part = &record.part;
        let price = part.price.as_ref();
        let sql = format!(
            r#"
            INSERT INTO nags_parts_cache (
                id, vin_pattern, glass_position, year, make, model,
                nags_part_number, nags_part_number_alt, features,
                price_cost, price_source, price_as_of, description,
                source, confidence, verified, lookup_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 0)
            ON CONFLICT (vin_pattern, glass_position) DO UPDATE SET
                year = EXCLUDED.year,
                make = EXCLUDED.make,
                model = EXCLUDED.model,
                nags_part_number = EXCLUDED.nags_part_number,
                nags_part_number_alt = EXCLUDED.nags_part_number_alt,
                features = EXCLUDED.features,
                price_cost = EXCLUDED.price_cost,
                price_source = EXCLUDED.price_source,
                price_as_of = EXCLUDED.price_as_of,
                description = EXCLUDED.description,
                source = EXCLUDED.source,
                confidence = EXCLUDED.confidence,
                verified = EXCLUDED.verified,
                updated_at = NOW()
            RETURNING {CACHED_PART_COLUMNS}
            "#
        );

        let stored = sqlx::query_as::<_, CachedPart>(&sql)
            .bind(Uuid::new_v4())
            .bind(&record.vin_pattern)
            .bind(record.glass_position.as_str())
            .bind(record.year)
            .bind(&record.make)
            .bind(&record.model)
            .bind(&part.nags_part_number)
            .bind(&part.nags_part_number_alt)
            .bind(Json(&part.features))
            .bind(price.map(|p| p.cost))
            .bind(price.map(|p| p.source.as_str()))
            .bind(price.map(|p| p.as_of_date))
            .bind(&part.description)
            .bind(&record.source)
            .bind(i16::from(record.confidence))
            .bind(record.verified)
            .fetch_one(&self.pool)
            .await?;

        Ok(stored)
    }

    async fn delete(&self, vin_pattern: &str, position: GlassPosition) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM nags_parts_cache WHERE vin_pattern = $1 AND glass_position = $2",
        )
        .bind(vin_pattern)
        .bind(position.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let (total_rows, verified_rows, total_lookups): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE verified),
                   COALESCE(SUM(lookup_count), 0)::BIGINT
            FROM nags_parts_cache
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CacheStats {
            total_rows,
            verified_rows,
            total_lookups,
        })
    }
}
