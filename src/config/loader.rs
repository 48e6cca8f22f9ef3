//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles base file discovery,
//! environment overlays and `GLASS_LOOKUP__SECTION__KEY` variable overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::LookupConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "glass-lookup";
const ENV_PREFIX: &str = "GLASS_LOOKUP";

/// Loaded, validated configuration plus the context it was loaded from
#[derive(Debug)]
pub struct ConfigManager {
    config: LookupConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading lookup configuration"
        );

        let config = Self::load_layers(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            distributors = config.distributors.len(),
            fallback_enabled = config.fallback.enabled,
            retry_poll_seconds = config.retry_queue.poll_interval_seconds,
            "⚙️ Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn load_layers(config_directory: &Path, environment: &str) -> ConfigResult<LookupConfig> {
        let base_path = config_directory.join(format!("{BASE_FILE_STEM}.yaml"));
        if !base_path.exists() {
            return Err(ConfigurationError::config_file_not_found(base_path));
        }
        let overlay_path = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.yaml"));

        ::config::Config::builder()
            .add_source(::config::File::from(base_path))
            .add_source(::config::File::from(overlay_path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|layered| layered.try_deserialize::<LookupConfig>())
            .map_err(|e| ConfigurationError::load_error(environment, e))
    }

    /// Detect the current environment
    pub fn detect_environment() -> String {
        env::var("GLASS_LOOKUP_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("GLASS_LOOKUP_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BASE_YAML: &str = r#"
database:
  url: postgresql://localhost/glass_lookup_test
  max_connections: 4
distributors:
  - id: mygrant
    enabled: true
    base_url: https://portal.mygrant.example
    min_interval_ms: 4000
  - id: pgw
    enabled: false
fallback:
  enabled: true
  base_url: https://edi.omega.example
  api_key: secret
retry_queue:
  poll_interval_seconds: 15
"#;

    #[test]
    fn test_load_base_and_overlay() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("glass-lookup.yaml"), BASE_YAML).unwrap();
        fs::write(
            dir.path().join("glass-lookup.test.yaml"),
            "retry_queue:\n  poll_interval_seconds: 5\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        let config = manager.config();

        assert_eq!(manager.environment(), "test");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.retry_queue.poll_interval_seconds, 5);
        // untouched sections fall back to defaults
        assert_eq!(config.retry_queue.max_delay_seconds, 3600);

        let mygrant = config.distributor("mygrant").unwrap();
        assert!(mygrant.enabled);
        assert_eq!(mygrant.min_interval_ms, 4000);
        assert!(!config.distributor("pgw").unwrap().enabled);
        assert!(config.fallback.enabled);
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }
}
