//! # Encrypted Credential Vault
//!
//! Distributor logins stored at rest as an age-encrypted, ASCII-armored TOML
//! document. Decrypted form:
//!
//! ```toml
//! [meta]
//! version = 1
//! modified_at = "2026-04-01T12:00:00Z"
//!
//! [distributors.mygrant]
//! username = "shop-42"
//! password = "..."
//! account_id = "A-1001"
//! ```
//!
//! [`VaultCredentialProvider`] decrypts the file on every login, so rotated
//! credentials are picked up without a restart and plaintext only lives for
//! the length of one login.

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::x25519;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::session::{CredentialProvider, DistributorCredentials};
use crate::config::{ConfigurationError, CredentialsConfig};
use crate::error::{LookupError, Result};

const VAULT_VERSION: u32 = 1;

/// Identity fallback when `credentials.identity_path` is not configured
pub const IDENTITY_ENV_VAR: &str = "GLASS_LOOKUP_VAULT_IDENTITY";

fn vault_error(message: impl Into<String>) -> LookupError {
    LookupError::CredentialVault {
        message: message.into(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultMeta {
    version: u32,
    modified_at: DateTime<Utc>,
}

/// Decrypted vault contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialVault {
    meta: VaultMeta,
    #[serde(default)]
    distributors: BTreeMap<String, DistributorCredentials>,
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self {
            meta: VaultMeta {
                version: VAULT_VERSION,
                modified_at: Utc::now(),
            },
            distributors: BTreeMap::new(),
        }
    }
}

impl CredentialVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, distributor: impl Into<String>, credentials: DistributorCredentials) {
        self.distributors.insert(distributor.into(), credentials);
        self.meta.modified_at = Utc::now();
    }

    pub fn get(&self, distributor: &str) -> Option<&DistributorCredentials> {
        self.distributors.get(distributor)
    }

    pub fn distributor_ids(&self) -> Vec<&str> {
        self.distributors.keys().map(String::as_str).collect()
    }

    /// Serialize and encrypt to every recipient, armored
    pub fn encrypt(&self, recipients: &[x25519::Recipient]) -> Result<Vec<u8>> {
        let plaintext = toml::to_string_pretty(self)
            .map_err(|e| vault_error(format!("failed to serialize vault: {e}")))?;

        let encryptor =
            age::Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
                .map_err(|e| vault_error(format!("no usable recipients: {e}")))?;

        let io_error = |e: std::io::Error| vault_error(format!("failed to encrypt vault: {e}"));
        let mut encrypted = Vec::new();
        {
            let armor = ArmoredWriter::wrap_output(&mut encrypted, Format::AsciiArmor)
                .map_err(io_error)?;
            let mut writer = encryptor.wrap_output(armor).map_err(io_error)?;
            writer.write_all(plaintext.as_bytes()).map_err(io_error)?;
            writer
                .finish()
                .and_then(|armor| armor.finish())
                .map_err(io_error)?;
        }
        Ok(encrypted)
    }

    /// Decrypt and parse; a wrong identity fails without exposing any content
    pub fn decrypt(data: &[u8], identity: &x25519::Identity) -> Result<Self> {
        let decryptor = age::Decryptor::new(ArmoredReader::new(data))
            .map_err(|e| vault_error(format!("not an age-encrypted vault: {e}")))?;
        let mut reader = decryptor
            .decrypt(std::iter::once(identity as &dyn age::Identity))
            .map_err(|e| vault_error(format!("failed to decrypt vault: {e}")))?;

        let mut plaintext = String::new();
        reader
            .read_to_string(&mut plaintext)
            .map_err(|e| vault_error(format!("failed to read decrypted vault: {e}")))?;

        let vault: Self = toml::from_str(&plaintext)
            .map_err(|e| vault_error(format!("failed to parse decrypted vault: {e}")))?;
        if vault.meta.version != VAULT_VERSION {
            return Err(vault_error(format!(
                "unsupported vault version {} (expected {VAULT_VERSION})",
                vault.meta.version
            )));
        }
        Ok(vault)
    }
}

/// Parse an age identity, skipping blank and `#` comment lines as written by `age-keygen`
pub fn parse_identity(raw: &str) -> Result<x25519::Identity> {
    let key = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or_else(|| vault_error("identity is empty"))?;
    x25519::Identity::from_str(key).map_err(|e| vault_error(format!("invalid age identity: {e}")))
}

/// Credential provider backed by an encrypted vault file
pub struct VaultCredentialProvider {
    path: PathBuf,
    identity: x25519::Identity,
}

impl fmt::Debug for VaultCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultCredentialProvider")
            .field("path", &self.path)
            .field("identity", &"[REDACTED]")
            .finish()
    }
}

impl VaultCredentialProvider {
    pub fn new(path: impl Into<PathBuf>, identity: x25519::Identity) -> Self {
        Self {
            path: path.into(),
            identity,
        }
    }

    /// `None` when no vault is configured
    pub fn from_config(config: &CredentialsConfig) -> Result<Option<Self>> {
        let Some(vault_path) = config.vault_path.as_deref() else {
            return Ok(None);
        };

        let raw_identity = match config.identity_path.as_deref() {
            Some(identity_path) => std::fs::read_to_string(identity_path).map_err(|e| {
                ConfigurationError::invalid_value(
                    "credentials.identity_path",
                    identity_path,
                    format!("identity file could not be read: {e}"),
                )
            })?,
            None => std::env::var(IDENTITY_ENV_VAR).map_err(|_| {
                ConfigurationError::missing_required_field(
                    "credentials.identity_path",
                    format!("encrypted credential vault ({IDENTITY_ENV_VAR} not set)"),
                )
            })?,
        };
        let identity = parse_identity(&raw_identity)?;

        info!(vault_path = %vault_path, "🔐 Distributor credentials served from encrypted vault");
        Ok(Some(Self::new(vault_path, identity)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<CredentialVault> {
        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            vault_error(format!("failed to read {}: {e}", self.path.display()))
        })?;
        CredentialVault::decrypt(&data, &self.identity)
    }
}

#[async_trait]
impl CredentialProvider for VaultCredentialProvider {
    async fn credentials(&self, distributor: &str) -> Result<DistributorCredentials> {
        let vault = self
            .open()
            .await
            .map_err(|e| LookupError::authentication(distributor, e.to_string()))?;
        debug!(distributor = %distributor, "Credential vault decrypted for login");

        vault
            .get(distributor)
            .cloned()
            .ok_or_else(|| LookupError::authentication(distributor, "no entry in credential vault"))
    }
}
