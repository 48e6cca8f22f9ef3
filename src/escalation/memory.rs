//! In-process escalation repository.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::EscalationRepository;
use crate::error::Result;
use crate::models::{EscalationEntry, EscalationResolution, EscalationStatus};

#[derive(Debug, Default)]
pub struct InMemoryEscalationRepository {
    entries: DashMap<Uuid, EscalationEntry>,
}

impl InMemoryEscalationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry regardless of status, oldest first
    pub fn all(&self) -> Vec<EscalationEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }
}

#[async_trait]
impl EscalationRepository for InMemoryEscalationRepository {
    async fn insert(&self, entry: EscalationEntry) -> Result<EscalationEntry> {
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find(&self, id: Uuid) -> Result<Option<EscalationEntry>> {
        Ok(self.entries.get(&id).map(|e| e.value().clone()))
    }

    async fn pending(&self, limit: i64) -> Result<Vec<EscalationEntry>> {
        let mut pending: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.status == EscalationStatus::Pending.as_str())
            .map(|e| e.value().clone())
            .collect();
        pending.sort_by(|a, b| {
            b.priority_rank
                .cmp(&a.priority_rank)
                .then(a.created_at.cmp(&b.created_at))
        });
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    async fn transition(&self, id: Uuid, from: EscalationStatus, to: EscalationStatus) -> Result<bool> {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            return Ok(false);
        };
        if entry.status != from.as_str() {
            return Ok(false);
        }
        entry.status = to.as_str().to_string();
        entry.updated_at = Utc::now();
        Ok(true)
    }

    async fn resolve(
        &self,
        id: Uuid,
        from: EscalationStatus,
        resolution: &EscalationResolution,
    ) -> Result<Option<EscalationEntry>> {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            return Ok(None);
        };
        if entry.status != from.as_str() {
            return Ok(None);
        }

        let now = Utc::now();
        entry.status = EscalationStatus::Resolved.as_str().to_string();
        entry.resolved_nags_number = Some(resolution.resolved_nags_number.clone());
        entry.resolved_by = Some(resolution.resolved_by.clone());
        entry.resolution_source = Some(resolution.resolution_source.clone());
        entry.resolution_notes = resolution.resolution_notes.clone();
        entry.resolved_at = Some(now);
        entry.updated_at = now;
        Ok(Some(entry.clone()))
    }
}
