//! # EDI Fallback (tier 3)
//!
//! Authoritative but paid catalog. Only reached for positions that the cache
//! and every distributor left unresolved, and called at most once per lookup.

pub mod omega;

pub use omega::OmegaEdiClient;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::constants::sources;
use crate::error::Result;
use crate::models::{GlassPartResult, GlassPosition, Provenance, SourcedPart, VehicleInfo};
use crate::orchestration::types::{PartsTier, TierLookupResult};

/// Transport to the EDI provider
#[async_trait]
pub trait EdiPartsApi: Send + Sync {
    async fn fetch_parts(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<Vec<GlassPartResult>>;
}

#[derive(Clone)]
pub struct EdiFallbackService {
    api: Arc<dyn EdiPartsApi>,
    enabled: bool,
}

impl std::fmt::Debug for EdiFallbackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdiFallbackService")
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl EdiFallbackService {
    pub fn new(api: Arc<dyn EdiPartsApi>) -> Self {
        Self { api, enabled: true }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[async_trait]
impl PartsTier for EdiFallbackService {
    fn tier_name(&self) -> &str {
        sources::OMEGA
    }

    #[instrument(skip(self, vehicle), fields(vin = %vehicle.vin))]
    async fn lookup(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<TierLookupResult> {
        let started = Instant::now();
        if !self.enabled || positions.is_empty() {
            debug!(enabled = self.enabled, "EDI fallback skipped");
            return Ok(TierLookupResult::empty(sources::OMEGA, 0));
        }

        let parts = self
            .api
            .fetch_parts(vehicle, positions)
            .await?
            .into_iter()
            .filter(|part| positions.contains(&part.glass_position))
            .map(|part| SourcedPart::new(part, Provenance::edi_fallback()))
            .collect();

        Ok(TierLookupResult::found(
            sources::OMEGA,
            parts,
            started.elapsed().as_millis() as u64,
        ))
    }
}
