pub mod cached_part;
pub mod escalation_entry;
pub mod glass_part;
pub mod lookup_log;
pub mod retry_entry;
pub mod vehicle;

// Re-export core models for easy access
pub use cached_part::{CacheStats, CachedPart, NewCachedPart};
pub use escalation_entry::{
    AttemptLogEntry, EscalationEntry, EscalationPriority, EscalationResolution, EscalationStatus,
    NewEscalationEntry,
};
pub use glass_part::{
    join_positions, GlassPartResult, GlassPosition, PartPrice, PartSource, Provenance, SourcedPart,
};
pub use lookup_log::LookupLogRow;
pub use retry_entry::{RetryEntry, RetryEntryStatus, RetryEntryUpdate};
pub use vehicle::{normalize_vin, validate_vin, vin_pattern, VehicleInfo};
