//! Distributor portal sessions and the credentials used to open them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{LookupError, Result};

/// Refresh this long before the portal's stated expiry
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// Portal login credentials. The password never appears in Debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct DistributorCredentials {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl fmt::Debug for DistributorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributorCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Source of decrypted portal credentials. Implementations own secret storage
/// and decryption; adapters only ever see plaintext at login time.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, distributor: &str) -> Result<DistributorCredentials>;
}

/// Fixed credential map, for tests and single-tenant deployments
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, DistributorCredentials>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, distributor: impl Into<String>, credentials: DistributorCredentials) -> Self {
        self.credentials.insert(distributor.into(), credentials);
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self, distributor: &str) -> Result<DistributorCredentials> {
        self.credentials
            .get(distributor)
            .cloned()
            .ok_or_else(|| LookupError::authentication(distributor, "no stored credentials"))
    }
}

/// Reads `GLASS_LOOKUP_<ID>_USERNAME` / `_PASSWORD` / `_ACCOUNT` at login time
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn credentials(&self, distributor: &str) -> Result<DistributorCredentials> {
        let prefix = format!("GLASS_LOOKUP_{}", distributor.to_ascii_uppercase());
        let read = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        match (read("USERNAME"), read("PASSWORD")) {
            (Some(username), Some(password)) => Ok(DistributorCredentials {
                username,
                password,
                account_id: read("ACCOUNT"),
            }),
            _ => Err(LookupError::authentication(
                distributor,
                format!("{prefix}_USERNAME / {prefix}_PASSWORD not set"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(token: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECONDS) >= self.expires_at
    }
}

/// Holds one adapter's current session; logs in lazily on first use or after expiry
#[derive(Debug)]
pub struct SessionSlot {
    distributor: String,
    current: Mutex<Option<SessionToken>>,
}

impl SessionSlot {
    pub fn new(distributor: impl Into<String>) -> Self {
        Self {
            distributor: distributor.into(),
            current: Mutex::new(None),
        }
    }

    /// Return a live token, running `login` when none is held or it has expired.
    /// Concurrent callers wait for a single login rather than each logging in.
    pub async fn token_or_login<F, Fut>(&self, login: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SessionToken>>,
    {
        let mut current = self.current.lock().await;
        if let Some(session) = current.as_ref() {
            if !session.is_expired(Utc::now()) {
                return Ok(session.token.clone());
            }
            debug!(distributor = %self.distributor, "Session expired, logging in again");
        }

        let session = login().await?;
        info!(
            distributor = %self.distributor,
            expires_at = %session.expires_at,
            "🔑 Distributor session established"
        );
        let token = session.token.clone();
        *current = Some(session);
        Ok(token)
    }

    /// Forget the session, e.g. after the portal rejects the token
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
