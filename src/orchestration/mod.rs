//! # Orchestration
//!
//! The lookup cascade and the wiring that assembles it.
//!
//! ## Core Components
//!
//! - **LookupOrchestrator**: sequences cache, distributors, EDI fallback and
//!   manual escalation for one request, and writes the audit row
//! - **PartsTier**: the seam tiers 2 and 3 sit behind, so the orchestrator can
//!   be driven with any pair of external sources
//! - **bootstrap**: builds a Postgres-backed orchestrator from [`LookupConfig`](crate::config::LookupConfig)

pub mod bootstrap;
pub mod lookup_orchestrator;
pub mod types;

pub use bootstrap::{build_orchestrator, LookupSystem};
pub use lookup_orchestrator::LookupOrchestrator;
pub use types::{
    LookupRequest, LookupResult, PartsTier, PositionSelector, TierLookupResult, TierTimings,
};
