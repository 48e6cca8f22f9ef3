//! # Retry Queue Worker
//!
//! Re-drives durable retry entries on a fixed poll interval. Each entry names
//! an `operation_type`; the handler registered for that type gets the entry's
//! JSON payload. Failures are rescheduled with exponential backoff until
//! `max_attempts` is reached, after which the entry is dead-lettered. Entries
//! with no registered handler, and entries whose handler fails with a terminal
//! error (an invalid or undecodable VIN), are dead-lettered straight away.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use glass_lookup::config::RetryQueueConfig;
//! use glass_lookup::retry::{InMemoryRetryQueueStore, RetryQueueWorker};
//!
//! # async fn example() {
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let worker = Arc::new(RetryQueueWorker::new(
//!     Arc::new(InMemoryRetryQueueStore::new()),
//!     &RetryQueueConfig::default(),
//! ));
//! let handle = worker.clone().spawn(shutdown_rx);
//! // ...
//! shutdown_tx.send(true).ok();
//! handle.await.ok();
//! # }
//! ```

pub mod backoff;
pub mod memory;
pub mod postgres;

pub use backoff::BackoffPolicy;
pub use memory::InMemoryRetryQueueStore;
pub use postgres::PgRetryQueueStore;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::RetryQueueConfig;
use crate::error::{LookupError, Result};
use crate::models::{RetryEntry, RetryEntryStatus, RetryEntryUpdate};

#[async_trait]
pub trait RetryQueueStore: Send + Sync {
    async fn enqueue(&self, entry: RetryEntry) -> Result<RetryEntry>;

    /// Pending entries whose `next_retry_at` has passed, earliest first
    async fn get_pending_entries(&self, batch_size: u32) -> Result<Vec<RetryEntry>>;

    async fn update_entry(&self, id: Uuid, update: &RetryEntryUpdate) -> Result<()>;

    async fn move_to_dead_letter(&self, id: Uuid, reason: &str) -> Result<()>;
}

/// Re-executes one kind of operation from its stored payload
#[async_trait]
pub trait RetryOperationHandler: Send + Sync {
    fn operation_type(&self) -> &str;

    async fn execute(&self, payload: &serde_json::Value) -> Result<()>;
}

/// Counts from one `process_batch` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBatchStats {
    pub fetched: usize,
    pub completed: usize,
    pub rescheduled: usize,
    pub dead_lettered: usize,
}

pub struct RetryQueueWorker {
    store: Arc<dyn RetryQueueStore>,
    handlers: HashMap<String, Arc<dyn RetryOperationHandler>>,
    policy: BackoffPolicy,
    batch_size: u32,
    max_attempts: u32,
    poll_interval: Duration,
}

impl std::fmt::Debug for RetryQueueWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryQueueWorker")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("batch_size", &self.batch_size)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl RetryQueueWorker {
    pub fn new(store: Arc<dyn RetryQueueStore>, config: &RetryQueueConfig) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            policy: BackoffPolicy::from_config(config),
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
            poll_interval: config.poll_interval(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn RetryOperationHandler>) -> Self {
        self.handlers
            .insert(handler.operation_type().to_string(), handler);
        self
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Persist a new entry, due immediately. Only operation types with a
    /// registered handler can be scheduled through the worker.
    pub async fn schedule(
        &self,
        operation_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<RetryEntry> {
        let operation_type = operation_type.into();
        if !self.handlers.contains_key(&operation_type) {
            return Err(LookupError::RetryQueue {
                message: format!("no handler registered for '{operation_type}'"),
            });
        }
        let max_attempts = i32::try_from(self.max_attempts).unwrap_or(i32::MAX);
        self.store
            .enqueue(RetryEntry::new(operation_type, payload, max_attempts))
            .await
    }

    /// Run every due entry once
    #[instrument(skip(self))]
    pub async fn process_batch(&self) -> Result<RetryBatchStats> {
        let entries = self.store.get_pending_entries(self.batch_size).await?;
        let mut stats = RetryBatchStats {
            fetched: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            match self.process_entry(&entry).await {
                Ok(EntryOutcome::Completed) => stats.completed += 1,
                Ok(EntryOutcome::Rescheduled) => stats.rescheduled += 1,
                Ok(EntryOutcome::DeadLettered) => stats.dead_lettered += 1,
                Err(e) => error!(
                    retry_id = %entry.id,
                    operation_type = %entry.operation_type,
                    error = %e,
                    "❌ Failed to record retry outcome"
                ),
            }
        }

        if stats.fetched > 0 {
            debug!(?stats, "Retry batch processed");
        }
        Ok(stats)
    }

    async fn process_entry(&self, entry: &RetryEntry) -> Result<EntryOutcome> {
        let Some(handler) = self.handlers.get(&entry.operation_type) else {
            let reason = format!("no handler registered for '{}'", entry.operation_type);
            self.dead_letter(entry, entry.attempts, &reason).await?;
            return Ok(EntryOutcome::DeadLettered);
        };

        let attempts = entry.attempts.saturating_add(1);
        match handler.execute(&entry.payload.0).await {
            Ok(()) => {
                self.store
                    .update_entry(
                        entry.id,
                        &RetryEntryUpdate {
                            attempts,
                            status: RetryEntryStatus::Completed,
                            next_retry_at: None,
                            last_error: None,
                        },
                    )
                    .await?;
                info!(
                    retry_id = %entry.id,
                    operation_type = %entry.operation_type,
                    attempts = attempts,
                    "✅ Retry succeeded"
                );
                Ok(EntryOutcome::Completed)
            }
            Err(e) if e.is_terminal() || attempts >= entry.max_attempts => {
                let reason = if e.is_terminal() {
                    format!("terminal error: {e}")
                } else {
                    format!("exhausted {attempts} attempts: {e}")
                };
                self.store
                    .update_entry(
                        entry.id,
                        &RetryEntryUpdate {
                            attempts,
                            status: RetryEntryStatus::DeadLetter,
                            next_retry_at: None,
                            last_error: Some(e.to_string()),
                        },
                    )
                    .await?;
                self.dead_letter(entry, attempts, &reason).await?;
                Ok(EntryOutcome::DeadLettered)
            }
            Err(e) => {
                // delay grows with the attempts made before this one
                let prior = u32::try_from(entry.attempts).unwrap_or(0);
                let next_retry_at = self.policy.next_retry_at(prior, Utc::now());
                self.store
                    .update_entry(
                        entry.id,
                        &RetryEntryUpdate {
                            attempts,
                            status: RetryEntryStatus::Pending,
                            next_retry_at: Some(next_retry_at),
                            last_error: Some(e.to_string()),
                        },
                    )
                    .await?;
                info!(
                    retry_id = %entry.id,
                    operation_type = %entry.operation_type,
                    attempts = attempts,
                    max_attempts = entry.max_attempts,
                    next_retry_at = %next_retry_at,
                    error = %e,
                    "🔁 Retry rescheduled"
                );
                Ok(EntryOutcome::Rescheduled)
            }
        }
    }

    async fn dead_letter(&self, entry: &RetryEntry, attempts: i32, reason: &str) -> Result<()> {
        self.store.move_to_dead_letter(entry.id, reason).await?;
        warn!(
            retry_id = %entry.id,
            operation_type = %entry.operation_type,
            attempts = attempts,
            reason = %reason,
            "☠️ Retry entry dead-lettered"
        );
        Ok(())
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_seconds = self.poll_interval.as_secs(),
            handlers = self.handlers.len(),
            "🔄 Retry queue worker started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.process_batch().await {
                        error!(error = %e, "❌ Retry queue poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("🛑 Retry queue worker stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

enum EntryOutcome {
    Completed,
    Rescheduled,
    DeadLettered,
}
