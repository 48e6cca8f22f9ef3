use async_trait::async_trait;
use parking_lot::Mutex;

use super::LookupLogRepository;
use crate::error::Result;
use crate::models::LookupLogRow;

/// Vec-backed audit sink that keeps insertion order
#[derive(Debug, Default)]
pub struct InMemoryLookupLogRepository {
    rows: Mutex<Vec<LookupLogRow>>,
}

impl InMemoryLookupLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    pub fn rows(&self) -> Vec<LookupLogRow> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl LookupLogRepository for InMemoryLookupLogRepository {
    async fn insert(&self, row: &LookupLogRow) -> Result<()> {
        self.rows.lock().push(row.clone());
        Ok(())
    }

    async fn recent_for_vin(&self, vin: &str, limit: i64) -> Result<Vec<LookupLogRow>> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .iter()
            .filter(|row| row.vin == vin)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
