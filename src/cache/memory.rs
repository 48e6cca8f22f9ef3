//! In-process cache repository backed by `DashMap`, for tests and embedded use.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::types::Json;
use uuid::Uuid;

use super::PartsCacheRepository;
use crate::error::{LookupError, Result};
use crate::models::{CacheStats, CachedPart, GlassPosition, NewCachedPart};

type CacheKey = (String, GlassPosition);

#[derive(Debug, Default)]
pub struct InMemoryPartsCacheRepository {
    rows: DashMap<CacheKey, CachedPart>,
}

impl InMemoryPartsCacheRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn apply_record(row: &mut CachedPart, record: &NewCachedPart) {
    let part = &record.part;
    row.year = record.year;
    row.make = record.make.clone();
    row.model = record.model.clone();
    row.nags_part_number = part.nags_part_number.clone();
    row.nags_part_number_alt = part.nags_part_number_alt.clone();
    row.features = Json(part.features.clone());
    row.price_cost = part.price.as_ref().map(|p| p.cost);
    row.price_source = part.price.as_ref().map(|p| p.source.clone());
    row.price_as_of = part.price.as_ref().map(|p| p.as_of_date);
    row.description = part.description.clone();
    row.source = record.source.clone();
    row.confidence = i16::from(record.confidence);
    row.verified = record.verified;
    row.updated_at = Utc::now();
}

#[async_trait]
impl PartsCacheRepository for InMemoryPartsCacheRepository {
    async fn find(&self, vin_pattern: &str, position: GlassPosition) -> Result<Option<CachedPart>> {
        Ok(self
            .rows
            .get(&(vin_pattern.to_string(), position))
            .map(|row| row.clone()))
    }

    async fn record_hit(&self, vin_pattern: &str, position: GlassPosition) -> Result<()> {
        let mut row = self
            .rows
            .get_mut(&(vin_pattern.to_string(), position))
            .ok_or_else(|| LookupError::NotFound {
                entity: "cached part",
                id: format!("{vin_pattern}/{position}"),
            })?;
        row.lookup_count += 1;
        row.last_lookup_at = Some(Utc::now());
        Ok(())
    }

    async fn upsert(&self, record: NewCachedPart) -> Result<CachedPart> {
        let key = (record.vin_pattern.clone(), record.glass_position);
        let mut entry = self.rows.entry(key).or_insert_with(|| {
            let now = Utc::now();
            CachedPart {
                id: Uuid::new_v4(),
                vin_pattern: record.vin_pattern.clone(),
                glass_position: record.glass_position.as_str().to_string(),
                year: record.year,
                make: String::new(),
                model: String::new(),
                nags_part_number: String::new(),
                nags_part_number_alt: None,
                features: Json(Vec::new()),
                price_cost: None,
                price_source: None,
                price_as_of: None,
                description: None,
                source: String::new(),
                confidence: 0,
                verified: false,
                lookup_count: 0,
                last_lookup_at: None,
                created_at: now,
                updated_at: now,
            }
        });
        apply_record(entry.value_mut(), &record);
        Ok(entry.value().clone())
    }

    async fn delete(&self, vin_pattern: &str, position: GlassPosition) -> Result<bool> {
        Ok(self
            .rows
            .remove(&(vin_pattern.to_string(), position))
            .is_some())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for row in self.rows.iter() {
            stats.total_rows += 1;
            if row.verified {
                stats.verified_rows += 1;
            }
            stats.total_lookups += row.lookup_count;
        }
        Ok(stats)
    }
}
