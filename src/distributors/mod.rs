//! # Distributor Lookup (tier 2)
//!
//! Fans one tier-2 request out over a fixed, ordered list of distributor
//! adapters. Each adapter only sees the positions still uncovered when its
//! turn comes, and the first adapter to return a part for a position wins.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        DistributorLookupService          │
//! │  ┌─────────────┐   ┌─────────────┐       │
//! │  │  mygrant    │──▶│    pgw      │──▶ …  │
//! │  │ gate+session│   │ gate+session│       │
//! │  └─────────────┘   └─────────────┘       │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!        TierLookupResult → orchestrator
//! ```
//!
//! Adapter failures never escape: an adapter that errors is logged and
//! treated as having found nothing, and the next adapter still runs.

pub mod mygrant;
pub mod pgw;
pub mod politeness;
pub mod position_mapping;
pub mod session;
pub mod vault;

pub use mygrant::MygrantAdapter;
pub use pgw::PgwAdapter;
pub use politeness::{Clock, ManualClock, PolitenessGate, SystemClock};
pub use position_mapping::{map_position, position_label};
pub use session::{
    CredentialProvider, DistributorCredentials, EnvCredentialProvider, SessionSlot, SessionToken,
    StaticCredentialProvider,
};
pub use vault::{CredentialVault, VaultCredentialProvider};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::{ConfigurationError, LookupConfig};
use crate::constants::sources;
use crate::error::Result;
use crate::models::{GlassPosition, SourcedPart, VehicleInfo};
use crate::orchestration::types::{PartsTier, TierLookupResult};

/// One distributor catalog. Implementations own their session lifecycle,
/// politeness spacing and response normalization.
#[async_trait]
pub trait DistributorAdapter: Send + Sync {
    /// Stable source id, recorded as the cache row's `source`
    fn id(&self) -> &str;

    /// Feature flag; a disabled adapter must not perform I/O
    fn is_enabled(&self) -> bool;

    async fn lookup_parts(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<Vec<SourcedPart>>;
}

#[derive(Clone, Default)]
pub struct DistributorLookupService {
    adapters: Vec<Arc<dyn DistributorAdapter>>,
}

impl std::fmt::Debug for DistributorLookupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributorLookupService")
            .field("adapters", &self.adapter_ids())
            .finish()
    }
}

impl DistributorLookupService {
    pub fn new(adapters: Vec<Arc<dyn DistributorAdapter>>) -> Self {
        Self { adapters }
    }

    /// Build the registered adapter list from configuration, in file order
    pub fn from_config(
        config: &LookupConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        // a configured vault takes precedence over the caller's provider
        let credentials = match VaultCredentialProvider::from_config(&config.credentials)? {
            Some(vault) => Arc::new(vault) as Arc<dyn CredentialProvider>,
            None => credentials,
        };

        let mut adapters: Vec<Arc<dyn DistributorAdapter>> = Vec::new();
        for distributor in &config.distributors {
            let adapter: Arc<dyn DistributorAdapter> = match distributor.id.as_str() {
                mygrant::DISTRIBUTOR_ID => {
                    Arc::new(MygrantAdapter::new(distributor.clone(), credentials.clone())?)
                }
                pgw::DISTRIBUTOR_ID => {
                    Arc::new(PgwAdapter::new(distributor.clone(), credentials.clone())?)
                }
                other => {
                    return Err(ConfigurationError::invalid_value(
                        "distributors[].id",
                        other,
                        "no adapter registered for this distributor",
                    )
                    .into())
                }
            };
            adapters.push(adapter);
        }
        Ok(Self::new(adapters))
    }

    pub fn adapter_ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Resolve as many of `positions` as the registered adapters can
    #[instrument(skip(self, vehicle), fields(vin_pattern = %vehicle.vin_pattern))]
    pub async fn lookup(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> TierLookupResult {
        let started = Instant::now();
        let mut remaining: Vec<GlassPosition> = positions.to_vec();
        let mut parts: Vec<SourcedPart> = Vec::new();
        let mut contributors: Vec<String> = Vec::new();

        for adapter in &self.adapters {
            if remaining.is_empty() {
                break;
            }
            if !adapter.is_enabled() {
                debug!(distributor = adapter.id(), "Distributor disabled, skipping");
                continue;
            }

            let found = match adapter.lookup_parts(vehicle, &remaining).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(
                        distributor = adapter.id(),
                        error = %e,
                        "⚠️ Distributor adapter failed, treating as no parts found"
                    );
                    continue;
                }
            };

            let mut contributed = false;
            for sourced in found {
                let position = sourced.part.glass_position;
                if let Some(index) = remaining.iter().position(|p| *p == position) {
                    remaining.remove(index);
                    parts.push(sourced);
                    contributed = true;
                }
            }
            if contributed {
                contributors.push(adapter.id().to_string());
            }
        }

        let source = match contributors.as_slice() {
            [single] => single.clone(),
            _ => sources::DISTRIBUTORS.to_string(),
        };
        TierLookupResult::found(source, parts, started.elapsed().as_millis() as u64)
    }
}

#[async_trait]
impl PartsTier for DistributorLookupService {
    fn tier_name(&self) -> &str {
        sources::DISTRIBUTORS
    }

    async fn lookup(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<TierLookupResult> {
        Ok(DistributorLookupService::lookup(self, vehicle, positions).await)
    }
}

/// "Rain Sensor" / "HEATED-WIPER" → "rain_sensor" / "heated_wiper"
pub(crate) fn normalize_feature_tag(raw: &str) -> Option<String> {
    let tag = raw
        .trim()
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    (!tag.is_empty()).then_some(tag)
}

/// Parse a dollar amount ("$1,289.50", "289.5") into cents
pub(crate) fn dollars_to_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let dollars: f64 = cleaned.parse().ok()?;
    (dollars.is_finite() && dollars >= 0.0).then(|| (dollars * 100.0).round() as i64)
}
