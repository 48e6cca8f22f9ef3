//! # Parts Cache (tier 1)
//!
//! Durable lookup keyed by `(vin_pattern, glass_position)`. [`PartsCache`]
//! owns the upsert and confidence semantics; storage backends implement
//! [`PartsCacheRepository`].
//!
//! Hits bump usage telemetry best-effort: a failed counter update is logged and
//! the read still succeeds, since the caller already has its answer.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryPartsCacheRepository;
pub use postgres::PgPartsCacheRepository;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::models::{
    CacheStats, CachedPart, GlassPartResult, GlassPosition, NewCachedPart, Provenance, VehicleInfo,
};

/// Narrow record-store interface for cache rows
#[async_trait]
pub trait PartsCacheRepository: Send + Sync {
    async fn find(&self, vin_pattern: &str, position: GlassPosition) -> Result<Option<CachedPart>>;

    /// Increment `lookup_count` and set `last_lookup_at = now`
    async fn record_hit(&self, vin_pattern: &str, position: GlassPosition) -> Result<()>;

    /// Insert or overwrite the row for the record's key. Must not fail on a
    /// concurrent insert of the same key.
    async fn upsert(&self, record: NewCachedPart) -> Result<CachedPart>;

    async fn delete(&self, vin_pattern: &str, position: GlassPosition) -> Result<bool>;

    async fn stats(&self) -> Result<CacheStats>;
}

/// Cache Store service used by the orchestrator
#[derive(Clone)]
pub struct PartsCache {
    repository: Arc<dyn PartsCacheRepository>,
    enabled: bool,
}

impl std::fmt::Debug for PartsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartsCache")
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl PartsCache {
    pub fn new(repository: Arc<dyn PartsCacheRepository>) -> Self {
        Self {
            repository,
            enabled: true,
        }
    }

    /// A disabled cache always misses and never writes
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Point lookup for one position
    #[instrument(skip(self), fields(vin_pattern = %vin_pattern, position = %position))]
    pub async fn lookup(
        &self,
        vin_pattern: &str,
        position: GlassPosition,
    ) -> Result<Option<GlassPartResult>> {
        if !self.enabled {
            return Ok(None);
        }

        let Some(row) = self.repository.find(vin_pattern, position).await? else {
            debug!("Cache miss");
            return Ok(None);
        };

        let part = row.to_part_result()?;

        if let Err(e) = self.repository.record_hit(vin_pattern, position).await {
            warn!(error = %e, "Failed to record cache hit telemetry");
        }

        debug!(
            nags_part_number = %part.nags_part_number,
            source = %row.source,
            confidence = row.confidence,
            "🎯 Cache hit"
        );
        Ok(Some(part))
    }

    /// Upsert a freshly resolved part. Confidence and verified are recomputed
    /// from the provenance on every write, whatever the previous row held.
    #[instrument(skip(self, vehicle, part), fields(vin_pattern = %vehicle.vin_pattern, position = %part.glass_position, source = %provenance.source))]
    pub async fn store(
        &self,
        vehicle: &VehicleInfo,
        part: &GlassPartResult,
        provenance: &Provenance,
    ) -> Result<Option<CachedPart>> {
        if !self.enabled {
            return Ok(None);
        }

        let record = NewCachedPart::from_resolution(vehicle, part, provenance);
        let stored = self.repository.upsert(record).await?;

        debug!(
            nags_part_number = %stored.nags_part_number,
            confidence = stored.confidence,
            verified = stored.verified,
            "💾 Cached resolved part"
        );
        Ok(Some(stored))
    }

    /// Drop a row, e.g. after a researcher corrects bad data
    pub async fn invalidate(&self, vin_pattern: &str, position: GlassPosition) -> Result<bool> {
        self.repository.delete(vin_pattern, position).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.repository.stats().await
    }
}
