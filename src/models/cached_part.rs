use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::glass_part::{GlassPartResult, GlassPosition, PartPrice, Provenance};
use super::vehicle::VehicleInfo;
use crate::error::Result;

/// CachedPart is the persisted tier-1 record for one (vin_pattern, glass_position) key.
/// Maps to the `nags_parts_cache` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CachedPart {
    pub id: Uuid,
    pub vin_pattern: String,
    pub glass_position: String,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub nags_part_number: String,
    pub nags_part_number_alt: Option<String>,
    pub features: Json<Vec<String>>,
    pub price_cost: Option<i64>,
    pub price_source: Option<String>,
    pub price_as_of: Option<NaiveDate>,
    pub description: Option<String>,
    pub source: String,
    pub confidence: i16,
    pub verified: bool,
    pub lookup_count: i64,
    pub last_lookup_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CachedPart {
    pub fn position(&self) -> Result<GlassPosition> {
        self.glass_position.parse()
    }

    /// Rebuild the part as originally stored
    pub fn to_part_result(&self) -> Result<GlassPartResult> {
        let price = match (self.price_cost, &self.price_source, self.price_as_of) {
            (Some(cost), Some(source), Some(as_of_date)) => Some(PartPrice {
                cost,
                source: source.clone(),
                as_of_date,
            }),
            _ => None,
        };

        Ok(GlassPartResult {
            nags_part_number: self.nags_part_number.clone(),
            nags_part_number_alt: self.nags_part_number_alt.clone(),
            glass_position: self.position()?,
            features: self.features.0.clone(),
            price,
            description: self.description.clone(),
        })
    }
}

/// Upsert payload; confidence and verified are derived from the provenance, never supplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCachedPart {
    pub vin_pattern: String,
    pub glass_position: GlassPosition,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub part: GlassPartResult,
    pub source: String,
    pub confidence: u8,
    pub verified: bool,
}

impl NewCachedPart {
    pub fn from_resolution(
        vehicle: &VehicleInfo,
        part: &GlassPartResult,
        provenance: &Provenance,
    ) -> Self {
        Self {
            vin_pattern: vehicle.vin_pattern.clone(),
            glass_position: part.glass_position,
            year: vehicle.year,
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            part: part.clone(),
            source: provenance.source.as_str().to_string(),
            confidence: provenance.confidence(),
            verified: provenance.verified(),
        }
    }
}

/// Aggregate counters over the cache table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_rows: i64,
    pub verified_rows: i64,
    pub total_lookups: i64,
}
