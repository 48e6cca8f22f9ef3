//! Shared mocks for the integration tests.
//!
//! Every external collaborator of the orchestrator has a hand-written stand-in
//! here that records how it was called, so tests can assert on call counts and
//! on the positions each tier was asked for.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use glass_lookup::audit::{InMemoryLookupLogRepository, LookupAuditLog};
use glass_lookup::cache::{InMemoryPartsCacheRepository, PartsCache, PartsCacheRepository};
use glass_lookup::decoder::VehicleDecoder;
use glass_lookup::error::{LookupError, Result};
use glass_lookup::escalation::{InMemoryEscalationRepository, ManualEscalationQueue};
use glass_lookup::models::{
    CacheStats, CachedPart, GlassPartResult, GlassPosition, NewCachedPart, Provenance,
    SourcedPart, VehicleInfo,
};
use glass_lookup::orchestration::{LookupOrchestrator, PartsTier, TierLookupResult};

pub const TEST_VIN: &str = "1HGCM82633A004352";

pub fn accord() -> VehicleInfo {
    VehicleInfo::new(TEST_VIN, 2003, "Honda", "Accord").with_body_style("Sedan")
}

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
}

pub fn part(nags: &str, position: GlassPosition) -> GlassPartResult {
    GlassPartResult::new(nags, position)
}

/// Decoder backed by a fixed VIN table
#[derive(Debug, Default)]
pub struct MockDecoder {
    vehicles: HashMap<String, VehicleInfo>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockDecoder {
    pub fn with_vehicle(vehicle: VehicleInfo) -> Self {
        let mut vehicles = HashMap::new();
        vehicles.insert(vehicle.vin.clone(), vehicle);
        Self {
            vehicles,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl VehicleDecoder for MockDecoder {
    async fn decode(&self, vin: &str) -> Result<Option<VehicleInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LookupError::Decode {
                vin: vin.to_string(),
                message: "decoder service unavailable".to_string(),
            });
        }
        Ok(self.vehicles.get(vin).cloned())
    }
}

/// Scripted external tier: returns a fixed set of parts (or an error) and
/// records every call
pub struct MockTier {
    name: String,
    parts: Vec<SourcedPart>,
    fail: bool,
    calls: Mutex<Vec<Vec<GlassPosition>>>,
}

impl MockTier {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parts: Vec::new(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(name: &str, parts: Vec<SourcedPart>) -> Self {
        Self {
            parts,
            ..Self::empty(name)
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::empty(name)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Vec<GlassPosition>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PartsTier for MockTier {
    fn tier_name(&self) -> &str {
        &self.name
    }

    async fn lookup(
        &self,
        _vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<TierLookupResult> {
        self.calls.lock().push(positions.to_vec());
        if self.fail {
            return Err(LookupError::distributor(&self.name, "connection refused"));
        }
        Ok(TierLookupResult::found(self.name.clone(), self.parts.clone(), 1))
    }
}

/// Distributor parts with default distributor provenance
pub fn distributor_parts(distributor: &str, parts: Vec<GlassPartResult>) -> Vec<SourcedPart> {
    parts
        .into_iter()
        .map(|p| SourcedPart::new(p, Provenance::distributor(distributor)))
        .collect()
}

pub fn edi_parts(parts: Vec<GlassPartResult>) -> Vec<SourcedPart> {
    parts
        .into_iter()
        .map(|p| SourcedPart::new(p, Provenance::edi_fallback()))
        .collect()
}

/// In-memory cache repository that counts writes and can be told to fail
#[derive(Debug, Default)]
pub struct CountingCacheRepository {
    pub inner: InMemoryPartsCacheRepository,
    pub upserts: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl CountingCacheRepository {
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PartsCacheRepository for CountingCacheRepository {
    async fn find(&self, vin_pattern: &str, position: GlassPosition) -> Result<Option<CachedPart>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LookupError::NotFound {
                entity: "cache connection",
                id: "simulated".to_string(),
            });
        }
        self.inner.find(vin_pattern, position).await
    }

    async fn record_hit(&self, vin_pattern: &str, position: GlassPosition) -> Result<()> {
        self.inner.record_hit(vin_pattern, position).await
    }

    async fn upsert(&self, record: NewCachedPart) -> Result<CachedPart> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LookupError::NotFound {
                entity: "cache connection",
                id: "simulated".to_string(),
            });
        }
        self.inner.upsert(record).await
    }

    async fn delete(&self, vin_pattern: &str, position: GlassPosition) -> Result<bool> {
        self.inner.delete(vin_pattern, position).await
    }

    async fn stats(&self) -> Result<CacheStats> {
        self.inner.stats().await
    }
}

/// Fully wired orchestrator over mocks, with handles on every collaborator
pub struct Harness {
    pub orchestrator: LookupOrchestrator,
    pub decoder: Arc<MockDecoder>,
    pub cache_repository: Arc<CountingCacheRepository>,
    pub distributors: Arc<MockTier>,
    pub fallback: Arc<MockTier>,
    pub escalations: Arc<InMemoryEscalationRepository>,
    pub audit: Arc<InMemoryLookupLogRepository>,
}

impl Harness {
    pub fn new(distributors: MockTier, fallback: MockTier) -> Self {
        Self::with_decoder(MockDecoder::with_vehicle(accord()), distributors, fallback)
    }

    pub fn with_decoder(decoder: MockDecoder, distributors: MockTier, fallback: MockTier) -> Self {
        let decoder = Arc::new(decoder);
        let cache_repository = Arc::new(CountingCacheRepository::default());
        let distributors = Arc::new(distributors);
        let fallback = Arc::new(fallback);
        let escalations = Arc::new(InMemoryEscalationRepository::new());
        let audit = Arc::new(InMemoryLookupLogRepository::new());

        let orchestrator = LookupOrchestrator::new(
            decoder.clone(),
            PartsCache::new(cache_repository.clone()),
            distributors.clone(),
            fallback.clone(),
            ManualEscalationQueue::new(escalations.clone()),
            LookupAuditLog::new(audit.clone()),
        );

        Self {
            orchestrator,
            decoder,
            cache_repository,
            distributors,
            fallback,
            escalations,
            audit,
        }
    }

    /// Seed the cache directly, bypassing the write counter
    pub async fn seed_cache(&self, part: GlassPartResult, provenance: Provenance) {
        let vehicle = accord();
        self.cache_repository
            .inner
            .upsert(NewCachedPart::from_resolution(&vehicle, &part, &provenance))
            .await
            .unwrap();
    }

    pub async fn cached_row(&self, position: GlassPosition) -> Option<CachedPart> {
        self.cache_repository
            .inner
            .find(&accord().vin_pattern, position)
            .await
            .unwrap()
    }
}
