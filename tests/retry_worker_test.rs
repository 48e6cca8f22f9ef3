//! Retry queue worker: completion, backoff rescheduling, dead-lettering and
//! shutdown of the poll loop.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glass_lookup::config::RetryQueueConfig;
use glass_lookup::error::{LookupError, Result};
use glass_lookup::models::{RetryEntry, RetryEntryStatus};
use glass_lookup::retry::{
    InMemoryRetryQueueStore, RetryOperationHandler, RetryQueueStore, RetryQueueWorker,
};

struct CountingHandler {
    operation_type: &'static str,
    fail: bool,
    calls: AtomicUsize,
}

impl CountingHandler {
    fn new(operation_type: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            operation_type,
            fail,
            calls: AtomicUsize::new(0),
        })
    }
}

/// Fails the way a backfill does when the stored VIN can never decode
struct UndecodableVinHandler;

#[async_trait]
impl RetryOperationHandler for UndecodableVinHandler {
    fn operation_type(&self) -> &str {
        "cache_backfill"
    }

    async fn execute(&self, _payload: &serde_json::Value) -> Result<()> {
        Err(LookupError::InvalidVin {
            vin: "1HGCM82633A00435".to_string(),
            reason: "must be 17 characters".to_string(),
        })
    }
}

#[async_trait]
impl RetryOperationHandler for CountingHandler {
    fn operation_type(&self) -> &str {
        self.operation_type
    }

    async fn execute(&self, _payload: &serde_json::Value) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LookupError::Fallback {
                message: "upstream 503".to_string(),
            });
        }
        Ok(())
    }
}

fn config() -> RetryQueueConfig {
    RetryQueueConfig {
        poll_interval_seconds: 1,
        max_attempts: 3,
        base_delay_seconds: 30,
        jitter_enabled: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_successful_retry_completes_entry() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let handler = CountingHandler::new("cache_backfill", false);
    let worker = RetryQueueWorker::new(store.clone(), &config()).with_handler(handler.clone());

    let entry = worker
        .schedule("cache_backfill", serde_json::json!({"vin_pattern": "1HGCM82633A"}))
        .await
        .unwrap();

    let stats = worker.process_batch().await.unwrap();
    assert_eq!(stats.fetched, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    let stored = store.get(entry.id).unwrap();
    assert_eq!(stored.status, RetryEntryStatus::Completed.as_str());
    assert_eq!(stored.attempts, 1);

    // completed entries are never picked up again
    assert_eq!(worker.process_batch().await.unwrap().fetched, 0);
}

#[tokio::test]
async fn test_failure_reschedules_with_backoff() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let worker = RetryQueueWorker::new(store.clone(), &config())
        .with_handler(CountingHandler::new("escalation_insert", true));

    let entry = worker
        .schedule("escalation_insert", serde_json::json!({}))
        .await
        .unwrap();
    let before = Utc::now();

    let stats = worker.process_batch().await.unwrap();
    assert_eq!(stats.rescheduled, 1);

    let stored = store.get(entry.id).unwrap();
    assert_eq!(stored.status, RetryEntryStatus::Pending.as_str());
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.last_error.as_deref(), Some("EDI fallback failed: upstream 503"));
    assert!(stored.next_retry_at >= before + chrono::Duration::seconds(29));
    assert!(stored.next_retry_at <= Utc::now() + chrono::Duration::seconds(31));

    // not due yet
    assert_eq!(worker.process_batch().await.unwrap().fetched, 0);
}

#[tokio::test]
async fn test_exhausted_entry_is_dead_lettered() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let handler = CountingHandler::new("audit_write", true);
    let worker = RetryQueueWorker::new(store.clone(), &config()).with_handler(handler.clone());

    let mut entry = RetryEntry::new("audit_write", serde_json::json!({}), 3);
    entry.attempts = 2;
    let entry = store.enqueue(entry).await.unwrap();

    let stats = worker.process_batch().await.unwrap();
    assert_eq!(stats.dead_lettered, 1);

    let stored = store.get(entry.id).unwrap();
    assert_eq!(stored.status, RetryEntryStatus::DeadLetter.as_str());
    assert_eq!(stored.attempts, 3);
    assert!(stored
        .dead_letter_reason
        .as_deref()
        .unwrap()
        .starts_with("exhausted 3 attempts"));

    assert_eq!(worker.process_batch().await.unwrap().fetched, 0);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_operation_type_is_dead_lettered() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let worker = RetryQueueWorker::new(store.clone(), &config());

    // written by another process that knows an operation this worker does not
    let entry = store
        .enqueue(RetryEntry::new("reindex_catalog", serde_json::json!({}), 3))
        .await
        .unwrap();

    let stats = worker.process_batch().await.unwrap();
    assert_eq!(stats.dead_lettered, 1);

    let stored = store.get(entry.id).unwrap();
    assert_eq!(stored.status, RetryEntryStatus::DeadLetter.as_str());
    assert_eq!(stored.attempts, 0);
    assert!(stored
        .dead_letter_reason
        .as_deref()
        .unwrap()
        .contains("reindex_catalog"));
}

#[tokio::test]
async fn test_batch_size_limits_each_pass() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let worker = RetryQueueWorker::new(
        store.clone(),
        &RetryQueueConfig {
            batch_size: 2,
            ..config()
        },
    )
    .with_handler(CountingHandler::new("cache_backfill", false));

    for _ in 0..3 {
        worker
            .schedule("cache_backfill", serde_json::json!({}))
            .await
            .unwrap();
    }

    assert_eq!(worker.process_batch().await.unwrap().completed, 2);
    assert_eq!(worker.process_batch().await.unwrap().completed, 1);
}

#[tokio::test]
async fn test_run_loop_processes_and_stops_on_shutdown() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let handler = CountingHandler::new("cache_backfill", false);
    let worker = Arc::new(
        RetryQueueWorker::new(store.clone(), &config()).with_handler(handler.clone()),
    );
    worker
        .schedule("cache_backfill", serde_json::json!({}))
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = worker.clone().spawn(shutdown_rx);

    // the first tick fires immediately
    for _ in 0..50 {
        if handler.calls.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_schedule_rejects_operation_without_handler() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let worker = RetryQueueWorker::new(store.clone(), &config());

    let err = worker
        .schedule("reindex_catalog", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, LookupError::RetryQueue { .. }));
    assert!(err.to_string().contains("reindex_catalog"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_terminal_error_is_dead_lettered_on_first_failure() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let worker = RetryQueueWorker::new(store.clone(), &config())
        .with_handler(Arc::new(UndecodableVinHandler));

    let entry = worker
        .schedule("cache_backfill", serde_json::json!({"vin": "1HGCM82633A00435"}))
        .await
        .unwrap();

    let stats = worker.process_batch().await.unwrap();
    assert_eq!(stats.dead_lettered, 1);
    assert_eq!(stats.rescheduled, 0);

    let stored = store.get(entry.id).unwrap();
    assert_eq!(stored.status, RetryEntryStatus::DeadLetter.as_str());
    assert_eq!(stored.attempts, 1);
    assert!(stored
        .dead_letter_reason
        .as_deref()
        .unwrap()
        .starts_with("terminal error"));
}

#[tokio::test]
async fn test_workers_sharing_a_store_run_each_entry_once() {
    let store = Arc::new(InMemoryRetryQueueStore::new());
    let handler = CountingHandler::new("cache_backfill", false);
    let workers: Vec<_> = (0..3)
        .map(|_| {
            Arc::new(
                RetryQueueWorker::new(
                    store.clone(),
                    &RetryQueueConfig {
                        batch_size: 4,
                        ..config()
                    },
                )
                .with_handler(handler.clone()),
            )
        })
        .collect();

    for _ in 0..10 {
        workers[0]
            .schedule("cache_backfill", serde_json::json!({}))
            .await
            .unwrap();
    }

    let handles: Vec<_> = workers
        .iter()
        .map(|worker| {
            let worker = worker.clone();
            tokio::spawn(async move { worker.process_batch().await.unwrap() })
        })
        .collect();
    let mut completed = 0;
    for handle in handles {
        completed += handle.await.unwrap().completed;
    }

    assert_eq!(completed, 10);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 10);
}
