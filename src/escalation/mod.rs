//! # Manual Escalation Queue (tier 4)
//!
//! Durable queue of positions no automated tier could resolve. The cascade
//! side only ever enqueues, fire-and-forget. The human side (listing,
//! claiming, resolving) is owned here too, and every status change is a
//! guarded transition: `pending → in_progress → resolved`, or straight
//! `pending → resolved`.
//!
//! Entries are not deduplicated. Two lookups that miss on the same vehicle
//! produce two entries, each linked to its own transaction.
//!
//! ```rust
//! use std::sync::Arc;
//! use glass_lookup::escalation::{InMemoryEscalationRepository, ManualEscalationQueue};
//!
//! # tokio_test::block_on(async {
//! let queue = ManualEscalationQueue::new(Arc::new(InMemoryEscalationRepository::new()));
//! assert!(queue.pending(50).await.unwrap().is_empty());
//! # });
//! ```

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEscalationRepository;
pub use postgres::PgEscalationRepository;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::error::{LookupError, Result};
use crate::models::{
    EscalationEntry, EscalationResolution, EscalationStatus, NewEscalationEntry,
};

#[async_trait]
pub trait EscalationRepository: Send + Sync {
    async fn insert(&self, entry: EscalationEntry) -> Result<EscalationEntry>;

    async fn find(&self, id: Uuid) -> Result<Option<EscalationEntry>>;

    /// Pending entries, most urgent first, oldest first within a priority
    async fn pending(&self, limit: i64) -> Result<Vec<EscalationEntry>>;

    /// Move `id` to `to` only if it is currently in `from`; `false` when the
    /// row was not in `from` (lost a race or already moved on)
    async fn transition(&self, id: Uuid, from: EscalationStatus, to: EscalationStatus) -> Result<bool>;

    /// Close `id` with the researcher's answer, only if it is currently in `from`
    async fn resolve(
        &self,
        id: Uuid,
        from: EscalationStatus,
        resolution: &EscalationResolution,
    ) -> Result<Option<EscalationEntry>>;
}

#[derive(Clone)]
pub struct ManualEscalationQueue {
    repository: Arc<dyn EscalationRepository>,
}

impl std::fmt::Debug for ManualEscalationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualEscalationQueue").finish()
    }
}

impl ManualEscalationQueue {
    pub fn new(repository: Arc<dyn EscalationRepository>) -> Self {
        Self { repository }
    }

    /// Enqueue one entry for the unresolved batch. Never fails the caller:
    /// a storage error is logged and the entry is lost.
    #[instrument(skip(self, request), fields(vin = %request.vehicle.vin, positions = request.glass_positions.len()))]
    pub async fn queue_for_research(&self, request: NewEscalationEntry) {
        let entry = request.into_entry();
        let id = entry.id;
        let priority = entry.priority.clone();

        match self.repository.insert(entry).await {
            Ok(_) => info!(escalation_id = %id, priority = %priority, "📋 Queued for manual research"),
            Err(e) => error!(escalation_id = %id, error = %e, "❌ Failed to queue manual research entry"),
        }
    }

    pub async fn pending(&self, limit: i64) -> Result<Vec<EscalationEntry>> {
        self.repository.pending(limit).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<EscalationEntry>> {
        self.repository.find(id).await
    }

    /// Claim a pending entry for research
    #[instrument(skip(self))]
    pub async fn start_research(&self, id: Uuid, researcher: &str) -> Result<()> {
        let current = self.current_status(id).await?;
        Self::guard(current, EscalationStatus::InProgress)?;

        if !self
            .repository
            .transition(id, current, EscalationStatus::InProgress)
            .await?
        {
            return Err(self.lost_race(id, EscalationStatus::InProgress).await);
        }

        info!(escalation_id = %id, researcher = %researcher, "🔬 Manual research started");
        Ok(())
    }

    /// Close an entry with the researcher's answer. Backfilling the cache is
    /// left to the resolver.
    #[instrument(skip(self, resolution), fields(resolved_by = %resolution.resolved_by))]
    pub async fn resolve(&self, id: Uuid, resolution: EscalationResolution) -> Result<EscalationEntry> {
        let current = self.current_status(id).await?;
        Self::guard(current, EscalationStatus::Resolved)?;

        match self.repository.resolve(id, current, &resolution).await? {
            Some(entry) => {
                info!(
                    escalation_id = %id,
                    nags_part_number = %resolution.resolved_nags_number,
                    "✅ Manual research resolved"
                );
                Ok(entry)
            }
            None => Err(self.lost_race(id, EscalationStatus::Resolved).await),
        }
    }

    async fn current_status(&self, id: Uuid) -> Result<EscalationStatus> {
        self.repository
            .find(id)
            .await?
            .ok_or_else(|| LookupError::NotFound {
                entity: "escalation entry",
                id: id.to_string(),
            })?
            .status()
    }

    fn guard(from: EscalationStatus, to: EscalationStatus) -> Result<()> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(LookupError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    async fn lost_race(&self, id: Uuid, to: EscalationStatus) -> LookupError {
        match self.current_status(id).await {
            Ok(from) => LookupError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptLogEntry, EscalationPriority, GlassPosition, VehicleInfo};

    fn request(priority: EscalationPriority) -> NewEscalationEntry {
        NewEscalationEntry {
            vehicle: VehicleInfo::new("1HGCM82633A004352", 2003, "Honda", "Accord"),
            glass_positions: vec![GlassPosition::BackGlass],
            transaction_id: Some("txn-9".to_string()),
            customer_context: serde_json::json!({"name": "Pat"}),
            priority,
            attempt_log: vec![AttemptLogEntry::new(3, "omega", "no_parts")],
        }
    }

    fn resolution() -> EscalationResolution {
        EscalationResolution {
            resolved_nags_number: "DB01234GTY".to_string(),
            resolved_by: "jamie".to_string(),
            resolution_source: "phone".to_string(),
            resolution_notes: Some("confirmed with dealer".to_string()),
        }
    }

    #[tokio::test]
    async fn test_no_dedup_for_repeated_requests() {
        let repository = Arc::new(InMemoryEscalationRepository::new());
        let queue = ManualEscalationQueue::new(repository.clone());

        queue.queue_for_research(request(EscalationPriority::Normal)).await;
        queue.queue_for_research(request(EscalationPriority::Normal)).await;

        assert_eq!(repository.len(), 2);
    }

    #[tokio::test]
    async fn test_pending_orders_by_priority_then_age() {
        let repository = Arc::new(InMemoryEscalationRepository::new());
        let queue = ManualEscalationQueue::new(repository);

        queue.queue_for_research(request(EscalationPriority::Low)).await;
        queue.queue_for_research(request(EscalationPriority::Urgent)).await;
        queue.queue_for_research(request(EscalationPriority::Normal)).await;

        let pending = queue.pending(10).await.unwrap();
        let priorities: Vec<_> = pending.iter().map(|e| e.priority().unwrap()).collect();
        assert_eq!(
            priorities,
            vec![
                EscalationPriority::Urgent,
                EscalationPriority::Normal,
                EscalationPriority::Low
            ]
        );
        assert_eq!(queue.pending(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_research_lifecycle() {
        let repository = Arc::new(InMemoryEscalationRepository::new());
        let queue = ManualEscalationQueue::new(repository);
        queue.queue_for_research(request(EscalationPriority::High)).await;
        let id = queue.pending(1).await.unwrap()[0].id;

        queue.start_research(id, "jamie").await.unwrap();
        assert!(queue.pending(10).await.unwrap().is_empty());

        let err = queue.start_research(id, "sam").await.unwrap_err();
        assert!(matches!(err, LookupError::InvalidTransition { .. }));

        let resolved = queue.resolve(id, resolution()).await.unwrap();
        assert_eq!(resolved.status().unwrap(), EscalationStatus::Resolved);
        assert_eq!(resolved.resolved_nags_number.as_deref(), Some("DB01234GTY"));
        assert!(resolved.resolved_at.is_some());

        let err = queue.resolve(id, resolution()).await.unwrap_err();
        assert!(matches!(err, LookupError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_pending_can_resolve_directly() {
        let repository = Arc::new(InMemoryEscalationRepository::new());
        let queue = ManualEscalationQueue::new(repository);
        queue.queue_for_research(request(EscalationPriority::Normal)).await;
        let id = queue.pending(1).await.unwrap()[0].id;

        let resolved = queue.resolve(id, resolution()).await.unwrap();
        assert_eq!(resolved.resolved_by.as_deref(), Some("jamie"));
    }

    #[tokio::test]
    async fn test_unknown_entry_is_not_found() {
        let queue = ManualEscalationQueue::new(Arc::new(InMemoryEscalationRepository::new()));
        let err = queue.start_research(Uuid::new_v4(), "jamie").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
    }

    struct BrokenRepository;

    #[async_trait]
    impl EscalationRepository for BrokenRepository {
        async fn insert(&self, _entry: EscalationEntry) -> Result<EscalationEntry> {
            Err(LookupError::Escalation {
                message: "connection reset".to_string(),
            })
        }
        async fn find(&self, _id: Uuid) -> Result<Option<EscalationEntry>> {
            Ok(None)
        }
        async fn pending(&self, _limit: i64) -> Result<Vec<EscalationEntry>> {
            Ok(Vec::new())
        }
        async fn transition(&self, _id: Uuid, _from: EscalationStatus, _to: EscalationStatus) -> Result<bool> {
            Ok(false)
        }
        async fn resolve(
            &self,
            _id: Uuid,
            _from: EscalationStatus,
            _resolution: &EscalationResolution,
        ) -> Result<Option<EscalationEntry>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_queue_for_research_swallows_storage_errors() {
        let queue = ManualEscalationQueue::new(Arc::new(BrokenRepository));
        queue.queue_for_research(request(EscalationPriority::Normal)).await;
    }
}
