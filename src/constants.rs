//! # System Constants
//!
//! Tier identifiers, source identifiers and the confidence table shared by the
//! orchestrator, the cache and the audit log.

use crate::models::GlassPosition;

/// Positions covered by the `"all"` selector.
pub const ALL_POSITIONS: [GlassPosition; 6] = [
    GlassPosition::Windshield,
    GlassPosition::BackGlass,
    GlassPosition::DoorFrontLeft,
    GlassPosition::DoorFrontRight,
    GlassPosition::DoorRearLeft,
    GlassPosition::DoorRearRight,
];

/// Length of the manufacturer/model/year-invariant VIN prefix used as cache key.
pub const VIN_PATTERN_LENGTH: usize = 11;

/// Full VIN length.
pub const VIN_LENGTH: usize = 17;

pub mod tiers {
    pub const NONE: u8 = 0;
    pub const CACHE: u8 = 1;
    pub const DISTRIBUTOR: u8 = 2;
    pub const FALLBACK: u8 = 3;
    pub const MANUAL: u8 = 4;
}

pub mod sources {
    pub const CACHE: &str = "cache";
    pub const OMEGA: &str = "omega";
    pub const MANUAL: &str = "manual";
    pub const PARTIAL: &str = "partial";
    pub const MANUAL_QUEUE: &str = "manual_queue";
    pub const ERROR: &str = "error";
    /// Reported when more than one distributor contributed parts to a single tier-2 call.
    pub const DISTRIBUTORS: &str = "distributors";
}

pub mod confidence {
    pub const EDI_FALLBACK: u8 = 100;
    pub const MANUAL: u8 = 95;
    pub const DISTRIBUTOR: u8 = 85;
}

pub mod system {
    pub const DEFAULT_RETRY_POLL_INTERVAL_SECONDS: u64 = 30;
    pub const DEFAULT_RETRY_MAX_DELAY_SECONDS: u64 = 3600;
    pub const DEFAULT_RETRY_BASE_DELAY_SECONDS: u64 = 30;
    pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_RETRY_BATCH_SIZE: u32 = 25;
    pub const DEFAULT_RETRY_CLAIM_TIMEOUT_SECONDS: u64 = 300;
    pub const DEFAULT_MIN_INTERVAL_MS: u64 = 3000;
    pub const DEFAULT_JITTER_MS: u64 = 2000;
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 20_000;
    pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 1800;
}
