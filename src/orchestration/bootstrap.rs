//! # Lookup System Bootstrap
//!
//! Assembles a Postgres-backed [`LookupOrchestrator`] from configuration:
//! repositories over one shared pool, the distributor adapters listed in
//! config, and the Omega EDI client.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::LookupOrchestrator;
use crate::audit::{LookupAuditLog, PgLookupLogRepository};
use crate::cache::{PartsCache, PgPartsCacheRepository};
use crate::config::{ConfigManager, LookupConfig};
use crate::database::{self, DatabaseConnection};
use crate::decoder::VehicleDecoder;
use crate::distributors::{CredentialProvider, DistributorLookupService};
use crate::error::Result;
use crate::escalation::{ManualEscalationQueue, PgEscalationRepository};
use crate::fallback::{EdiFallbackService, OmegaEdiClient};
use crate::retry::{PgRetryQueueStore, RetryQueueWorker};

/// Handle on a running lookup engine
pub struct LookupSystem {
    pub orchestrator: Arc<LookupOrchestrator>,
    pub database: DatabaseConnection,
    pub config_manager: Arc<ConfigManager>,
}

impl std::fmt::Debug for LookupSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupSystem")
            .field("orchestrator", &self.orchestrator)
            .field("environment", &self.config_manager.environment())
            .finish()
    }
}

impl LookupSystem {
    /// Validate config, connect (and migrate), then wire every tier
    pub async fn bootstrap(
        config_manager: Arc<ConfigManager>,
        decoder: Arc<dyn VehicleDecoder>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let config = config_manager.config();
        config.validate()?;

        let database = database::connect(&config.database).await?;
        let orchestrator =
            build_orchestrator(config, database.pool().clone(), decoder, credentials)?;

        info!(
            environment = %config_manager.environment(),
            distributors = config.distributors.len(),
            fallback_enabled = config.fallback.enabled,
            "🚀 Lookup system bootstrapped"
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            database,
            config_manager,
        })
    }

    /// Retry worker over the same pool; the caller registers handlers and spawns it
    pub fn retry_worker(&self) -> RetryQueueWorker {
        let retry_config = &self.config_manager.config().retry_queue;
        let store = PgRetryQueueStore::new(self.database.pool().clone())
            .with_claim_timeout(retry_config.claim_timeout());
        RetryQueueWorker::new(Arc::new(store), retry_config)
    }
}

/// Wire a Postgres-backed orchestrator without touching the database
pub fn build_orchestrator(
    config: &LookupConfig,
    pool: PgPool,
    decoder: Arc<dyn VehicleDecoder>,
    credentials: Arc<dyn CredentialProvider>,
) -> Result<LookupOrchestrator> {
    let cache = PartsCache::new(Arc::new(PgPartsCacheRepository::new(pool.clone())))
        .with_enabled(config.cache.enabled);
    let distributors = DistributorLookupService::from_config(config, credentials)?;
    let fallback = EdiFallbackService::new(Arc::new(OmegaEdiClient::new(&config.fallback)?))
        .with_enabled(config.fallback.enabled);
    let escalation = ManualEscalationQueue::new(Arc::new(PgEscalationRepository::new(pool.clone())));
    let audit = LookupAuditLog::new(Arc::new(PgLookupLogRepository::new(pool)));

    Ok(LookupOrchestrator::new(
        decoder,
        cache,
        Arc::new(distributors),
        Arc::new(fallback),
        escalation,
        audit,
    )
    .with_default_priority(config.escalation.default_priority))
}
