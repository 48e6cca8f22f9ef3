//! # Structured Logging Module
//!
//! Environment-aware structured logging for the lookup cascade. Console output
//! in development and test, JSON lines in production.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ConfigManager;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));

        let layer = if environment == "production" {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Embedding applications may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(environment = %environment, "🔧 STRUCTURED LOGGING: Initialized");
    });
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log the final outcome of one orchestrator invocation
pub fn log_lookup_operation(
    operation: &str,
    vin: &str,
    transaction_id: Option<&str>,
    tier: u8,
    source: &str,
    success: bool,
    duration_ms: u64,
) {
    tracing::info!(
        operation = %operation,
        vin = %vin,
        transaction_id = transaction_id,
        tier = tier,
        source = %source,
        success = success,
        duration_ms = duration_ms,
        "🔎 LOOKUP_OPERATION"
    );
}

/// Log what a single tier contributed to a cascade
pub fn log_tier_outcome(
    tier: u8,
    source: &str,
    requested: usize,
    resolved: usize,
    duration_ms: u64,
    error: Option<&str>,
) {
    if let Some(error) = error {
        tracing::warn!(
            tier = tier,
            source = %source,
            requested = requested,
            duration_ms = duration_ms,
            error = %error,
            "⚠️ TIER_SOFT_FAILURE"
        );
    } else {
        tracing::debug!(
            tier = tier,
            source = %source,
            requested = requested,
            resolved = resolved,
            duration_ms = duration_ms,
            "🧩 TIER_OUTCOME"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_tier_outcome(2, "mygrant", 2, 1, 15, None);
        log_tier_outcome(3, "omega", 1, 0, 40, Some("timeout"));
        log_lookup_operation("lookup", "1HGCM82633A004352", None, 3, "omega", true, 55);
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(default_log_level("production"), "info");
        assert_eq!(default_log_level("test"), "debug");
    }
}
