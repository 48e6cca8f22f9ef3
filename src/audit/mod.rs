//! # Lookup Audit Log
//!
//! Append-only record of every orchestrator invocation. Rows are written once
//! and never updated. A failed write is logged and dropped so that auditing can
//! never fail a lookup.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLookupLogRepository;
pub use postgres::PgLookupLogRepository;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::Result;
use crate::models::LookupLogRow;

#[async_trait]
pub trait LookupLogRepository: Send + Sync {
    async fn insert(&self, row: &LookupLogRow) -> Result<()>;

    /// Most recent rows for a VIN, newest first
    async fn recent_for_vin(&self, vin: &str, limit: i64) -> Result<Vec<LookupLogRow>>;
}

#[derive(Clone)]
pub struct LookupAuditLog {
    repository: Arc<dyn LookupLogRepository>,
}

impl std::fmt::Debug for LookupAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupAuditLog").finish()
    }
}

impl LookupAuditLog {
    pub fn new(repository: Arc<dyn LookupLogRepository>) -> Self {
        Self { repository }
    }

    pub async fn record(&self, row: LookupLogRow) {
        match self.repository.insert(&row).await {
            Ok(()) => debug!(
                audit_id = %row.id,
                tier = row.resolved_by_tier,
                source = %row.resolved_by_source,
                "Lookup audit row written"
            ),
            Err(e) => error!(
                vin = %row.vin,
                transaction_id = ?row.transaction_id,
                error = %e,
                "❌ Failed to write lookup audit row"
            ),
        }
    }

    pub async fn recent_for_vin(&self, vin: &str, limit: i64) -> Result<Vec<LookupLogRow>> {
        self.repository.recent_for_vin(vin, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn row(vin: &str, minutes_ago: i64) -> LookupLogRow {
        LookupLogRow {
            id: Uuid::new_v4(),
            vin: vin.to_string(),
            requested_positions: "windshield".to_string(),
            transaction_id: None,
            resolved_by_tier: 1,
            resolved_by_source: "cache".to_string(),
            cache_ms: Some(2),
            distributor_ms: None,
            fallback_ms: None,
            total_ms: 3,
            success: true,
            nags_part_number: Some("FW00001".to_string()),
            error: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_recent_for_vin_newest_first() {
        let repository = Arc::new(InMemoryLookupLogRepository::new());
        let audit = LookupAuditLog::new(repository.clone());

        audit.record(row("1HGCM82633A004352", 10)).await;
        audit.record(row("1HGCM82633A004352", 1)).await;
        audit.record(row("2T1BR32E54C123456", 5)).await;

        let recent = audit.recent_for_vin("1HGCM82633A004352", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].created_at > recent[1].created_at);
        assert_eq!(repository.len(), 3);
    }
}
