use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::RetryQueueStore;
use crate::constants::system;
use crate::error::{LookupError, Result};
use crate::models::{RetryEntry, RetryEntryStatus, RetryEntryUpdate};

/// In-process retry store for tests and embedded callers. Fetching claims
/// entries for the claim timeout, matching the Postgres store.
#[derive(Debug)]
pub struct InMemoryRetryQueueStore {
    entries: DashMap<Uuid, RetryEntry>,
    claim_timeout: Duration,
    claim_lock: Mutex<()>,
}

impl Default for InMemoryRetryQueueStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            claim_timeout: Duration::from_secs(system::DEFAULT_RETRY_CLAIM_TIMEOUT_SECONDS),
            claim_lock: Mutex::new(()),
        }
    }
}

impl InMemoryRetryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claim_timeout(mut self, claim_timeout: Duration) -> Self {
        self.claim_timeout = claim_timeout;
        self
    }

    pub fn get(&self, id: Uuid) -> Option<RetryEntry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn not_found(id: Uuid) -> LookupError {
        LookupError::NotFound {
            entity: "retry entry",
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl RetryQueueStore for InMemoryRetryQueueStore {
    async fn enqueue(&self, entry: RetryEntry) -> Result<RetryEntry> {
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_pending_entries(&self, batch_size: u32) -> Result<Vec<RetryEntry>> {
        let _claim = self.claim_lock.lock();
        let now = Utc::now();
        let mut due: Vec<(Uuid, DateTime<Utc>)> = self
            .entries
            .iter()
            .filter(|e| e.is_due(now))
            .map(|e| (e.id, e.next_retry_at))
            .collect();
        due.sort_by_key(|(_, next_retry_at)| *next_retry_at);
        due.truncate(batch_size as usize);

        let claimed_until = chrono::Duration::from_std(self.claim_timeout)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut claimed = Vec::with_capacity(due.len());
        for (id, _) in due {
            if let Some(mut entry) = self.entries.get_mut(&id) {
                entry.next_retry_at = claimed_until;
                entry.updated_at = now;
                claimed.push(entry.value().clone());
            }
        }
        Ok(claimed)
    }

    async fn update_entry(&self, id: Uuid, update: &RetryEntryUpdate) -> Result<()> {
        let mut entry = self.entries.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        entry.attempts = update.attempts;
        entry.status = update.status.as_str().to_string();
        if let Some(next_retry_at) = update.next_retry_at {
            entry.next_retry_at = next_retry_at;
        }
        if update.last_error.is_some() {
            entry.last_error = update.last_error.clone();
        }
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn move_to_dead_letter(&self, id: Uuid, reason: &str) -> Result<()> {
        let mut entry = self.entries.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        entry.status = RetryEntryStatus::DeadLetter.as_str().to_string();
        entry.dead_letter_reason = Some(reason.to_string());
        entry.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &InMemoryRetryQueueStore, count: usize) {
        for _ in 0..count {
            store
                .enqueue(RetryEntry::new("cache_backfill", serde_json::json!({}), 5))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_fetch_claims_entries_until_the_lease_lapses() {
        let store = InMemoryRetryQueueStore::new();
        seed(&store, 3).await;

        let first = store.get_pending_entries(2).await.unwrap();
        let second = store.get_pending_entries(10).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(second.iter().all(|e| first.iter().all(|f| f.id != e.id)));
        assert!(store.get_pending_entries(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_lease_makes_entries_visible_again() {
        let store = InMemoryRetryQueueStore::new().with_claim_timeout(Duration::ZERO);
        seed(&store, 1).await;

        assert_eq!(store.get_pending_entries(10).await.unwrap().len(), 1);
        assert_eq!(store.get_pending_entries(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_never_share_an_entry() {
        let store = std::sync::Arc::new(InMemoryRetryQueueStore::new());
        seed(&store, 20).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.get_pending_entries(8).await.unwrap() })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.await.unwrap().into_iter().map(|e| e.id));
        }
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 20);
    }

    #[tokio::test]
    async fn test_update_unknown_entry_is_not_found() {
        let store = InMemoryRetryQueueStore::new();
        let err = store
            .move_to_dead_letter(Uuid::new_v4(), "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
    }
}
