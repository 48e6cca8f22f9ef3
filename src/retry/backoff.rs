use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::RetryQueueConfig;

/// Up to 10% extra delay when jitter is enabled
const JITTER_FACTOR: f64 = 0.1;

/// Exponential backoff: `base * 2^attempts`, capped at `max_delay`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter,
        }
    }

    pub fn from_config(config: &RetryQueueConfig) -> Self {
        Self::new(
            Duration::from_secs(config.base_delay_seconds),
            Duration::from_secs(config.max_delay_seconds),
            config.jitter_enabled,
        )
    }

    /// Delay before the retry that follows `attempts` failed attempts
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempts).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);

        let jittered = if self.jitter {
            delay.mul_f64(1.0 + fastrand::f64() * JITTER_FACTOR)
        } else {
            delay
        };

        jittered.min(self.max_delay)
    }

    pub fn next_retry_at(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(self.delay_for(attempts))
            .unwrap_or_else(|_| chrono::Duration::seconds(self.max_delay.as_secs() as i64));
        now + delay
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RetryQueueConfig::default())
    }
}
