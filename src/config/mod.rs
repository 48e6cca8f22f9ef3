//! # Lookup Engine Configuration
//!
//! Serde-backed configuration for every component of the resolution cascade.
//! Values are layered by [`ConfigManager`]: a base YAML file, an optional
//! environment overlay, then `GLASS_LOOKUP__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glass_lookup::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let poll = manager.config().retry_queue.poll_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants::system;
use crate::models::EscalationPriority;

/// Root configuration structure mirroring glass-lookup.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub distributors: Vec<DistributorConfig>,
    pub credentials: CredentialsConfig,
    pub fallback: FallbackConfig,
    pub escalation: EscalationConfig,
    pub retry_queue: RetryQueueConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Skip migrations on startup (schema managed elsewhere)
    pub skip_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/glass_lookup_development".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
            skip_migrations: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// One distributor portal; the `id` selects the adapter implementation
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DistributorConfig {
    pub id: String,
    pub enabled: bool,
    pub base_url: String,
    pub account_id: Option<String>,
    pub min_interval_ms: u64,
    pub jitter_ms: u64,
    pub request_timeout_ms: u64,
    pub session_ttl_seconds: i64,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            enabled: false,
            base_url: String::new(),
            account_id: None,
            min_interval_ms: system::DEFAULT_MIN_INTERVAL_MS,
            jitter_ms: system::DEFAULT_JITTER_MS,
            request_timeout_ms: system::DEFAULT_REQUEST_TIMEOUT_MS,
            session_ttl_seconds: system::DEFAULT_SESSION_TTL_SECONDS,
        }
    }
}

impl DistributorConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Encrypted credential vault for distributor logins. When `vault_path` is
/// unset, adapters use the credential provider handed to bootstrap.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// age-encrypted TOML file holding one entry per distributor
    pub vault_path: Option<String>,
    /// File holding the age identity; `GLASS_LOOKUP_VAULT_IDENTITY` is used when unset
    pub identity_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_key: String::new(),
            request_timeout_ms: system::DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl FallbackConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Used when a request does not carry its own priority
    pub default_priority: EscalationPriority,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryQueueConfig {
    pub poll_interval_seconds: u64,
    pub batch_size: u32,
    pub max_attempts: u32,
    pub base_delay_seconds: u64,
    pub max_delay_seconds: u64,
    pub jitter_enabled: bool,
    /// How long a fetched entry stays invisible to other workers
    pub claim_timeout_seconds: u64,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: system::DEFAULT_RETRY_POLL_INTERVAL_SECONDS,
            batch_size: system::DEFAULT_RETRY_BATCH_SIZE,
            max_attempts: system::DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay_seconds: system::DEFAULT_RETRY_BASE_DELAY_SECONDS,
            max_delay_seconds: system::DEFAULT_RETRY_MAX_DELAY_SECONDS,
            jitter_enabled: true,
            claim_timeout_seconds: system::DEFAULT_RETRY_CLAIM_TIMEOUT_SECONDS,
        }
    }
}

impl RetryQueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_secs(self.claim_timeout_seconds)
    }
}

impl LookupConfig {
    /// Look up a distributor section by adapter id
    pub fn distributor(&self, id: &str) -> Option<&DistributorConfig> {
        self.distributors.iter().find(|d| d.id == id)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        let mut seen = HashSet::new();
        for distributor in &self.distributors {
            if distributor.id.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "distributors[].id",
                    "distributor configuration",
                ));
            }
            if !seen.insert(distributor.id.as_str()) {
                return Err(ConfigurationError::invalid_value(
                    "distributors[].id",
                    distributor.id.clone(),
                    "distributor ids must be unique",
                ));
            }
            if distributor.enabled && distributor.base_url.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("distributors.{}.base_url", distributor.id),
                    "enabled distributor",
                ));
            }
        }

        if matches!(self.credentials.vault_path.as_deref(), Some("")) {
            return Err(ConfigurationError::invalid_value(
                "credentials.vault_path",
                "",
                "vault path must not be empty when set",
            ));
        }

        if self.fallback.enabled && self.fallback.base_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "fallback.base_url",
                "enabled EDI fallback",
            ));
        }

        if self.retry_queue.poll_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry_queue.poll_interval_seconds",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        if self.retry_queue.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry_queue.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        if self.retry_queue.claim_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "retry_queue.claim_timeout_seconds",
                "0",
                "claim timeout must be greater than 0",
            ));
        }

        if self.retry_queue.max_delay_seconds < self.retry_queue.base_delay_seconds {
            return Err(ConfigurationError::invalid_value(
                "retry_queue.max_delay_seconds",
                self.retry_queue.max_delay_seconds.to_string(),
                "max delay must not be below base delay",
            ));
        }

        Ok(())
    }
}
