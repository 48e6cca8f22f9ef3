//! # Politeness Gate
//!
//! Per-adapter minimum spacing between outbound requests to a distributor
//! portal. The gate is owned by one adapter instance: two adapters never share
//! a gate, and every request an adapter makes (login included) passes through
//! it. Concurrent callers queue on the gate's mutex, so dispatches stay spaced
//! even when several lookups arrive at once.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Time source for the gate; swapped for a manual clock in tests
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
pub struct PolitenessGate {
    name: String,
    min_interval: Duration,
    max_jitter: Duration,
    clock: Arc<dyn Clock>,
    last_dispatch: Mutex<Option<Instant>>,
}

impl PolitenessGate {
    pub fn new(name: impl Into<String>, min_interval: Duration, max_jitter: Duration) -> Self {
        Self::with_clock(name, min_interval, max_jitter, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        min_interval: Duration,
        max_jitter: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            min_interval,
            max_jitter,
            clock,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until this adapter may dispatch, then claim the slot.
    /// Returns how long the caller was held back.
    pub async fn wait_for_turn(&self) -> Duration {
        let mut last_dispatch = self.last_dispatch.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_dispatch {
            let required = self.min_interval + self.jitter();
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < required {
                waited = required - elapsed;
                debug!(
                    distributor = %self.name,
                    wait_ms = waited.as_millis() as u64,
                    "⏳ Politeness delay before dispatch"
                );
                self.clock.sleep(waited).await;
            }
        }

        *last_dispatch = Some(self.clock.now());
        waited
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(0..=max_ms))
        }
    }
}

/// Manually advanced clock; `sleep` advances time instantly and records the request
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: parking_lot::Mutex<Duration>,
    sleeps: parking_lot::Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: parking_lot::Mutex::new(Duration::ZERO),
            sleeps: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}
