#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Glass Lookup Core
//!
//! Multi-tier resolution engine that maps a VIN and a set of glass positions
//! to NAGS part numbers and prices.
//!
//! ## Overview
//!
//! A lookup walks a fixed cascade and stops as soon as every requested
//! position is covered:
//!
//! 1. **Cache**: durable `(vin_pattern, glass_position)` store
//! 2. **Distributors**: scraped distributor portals, each behind its own
//!    politeness gate and session
//! 3. **EDI fallback**: the paid, authoritative Omega API
//! 4. **Manual escalation**: whatever is left is queued for a human researcher
//!
//! Parts found by tiers 2 and 3 are written back to the cache with
//! source-derived confidence. Every lookup writes exactly one audit row.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Lookup orchestrator, request/result types, bootstrap
//! - [`cache`] - Tier 1 cache store and repositories
//! - [`distributors`] - Tier 2 adapters, politeness gate, sessions, position mapping
//! - [`fallback`] - Tier 3 EDI fallback
//! - [`escalation`] - Tier 4 manual research queue
//! - [`audit`] - Append-only lookup log
//! - [`retry`] - Durable retry queue worker
//! - [`models`] - Vehicle, part and record types
//! - [`config`] - Layered YAML + environment configuration
//! - [`database`] - Postgres pool and migrations
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use glass_lookup::config::ConfigManager;
//! use glass_lookup::decoder::VehicleDecoder;
//! use glass_lookup::distributors::EnvCredentialProvider;
//! use glass_lookup::orchestration::{LookupRequest, LookupSystem, PositionSelector};
//!
//! # async fn example(decoder: Arc<dyn VehicleDecoder>) -> glass_lookup::Result<()> {
//! glass_lookup::logging::init_structured_logging();
//!
//! let system = LookupSystem::bootstrap(
//!     ConfigManager::load()?,
//!     decoder,
//!     Arc::new(EnvCredentialProvider),
//! )
//! .await?;
//!
//! let result = system
//!     .orchestrator
//!     .lookup(LookupRequest::new("1HGCM82633A004352", PositionSelector::All))
//!     .await;
//! println!("{} via {}", result.success, result.resolved_by_source);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod decoder;
pub mod distributors;
pub mod error;
pub mod escalation;
pub mod fallback;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use audit::{LookupAuditLog, LookupLogRepository};
pub use cache::{PartsCache, PartsCacheRepository};
pub use config::{ConfigManager, ConfigurationError, LookupConfig};
pub use decoder::VehicleDecoder;
pub use distributors::{DistributorAdapter, DistributorLookupService};
pub use error::{LookupError, Result};
pub use escalation::{EscalationRepository, ManualEscalationQueue};
pub use fallback::{EdiFallbackService, EdiPartsApi};
pub use models::{GlassPartResult, GlassPosition, VehicleInfo};
pub use orchestration::{
    LookupOrchestrator, LookupRequest, LookupResult, LookupSystem, PartsTier, PositionSelector,
    TierLookupResult,
};
pub use retry::{RetryOperationHandler, RetryQueueStore, RetryQueueWorker};
