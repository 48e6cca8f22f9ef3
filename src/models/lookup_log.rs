use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// LookupLogRow is the append-only audit record written once per orchestrator invocation.
/// Maps to the `nags_lookup_log` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LookupLogRow {
    pub id: Uuid,
    pub vin: String,
    pub requested_positions: String,
    pub transaction_id: Option<String>,
    pub resolved_by_tier: i16,
    pub resolved_by_source: String,
    pub cache_ms: Option<i64>,
    pub distributor_ms: Option<i64>,
    pub fallback_ms: Option<i64>,
    pub total_ms: i64,
    pub success: bool,
    pub nags_part_number: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
