//! # Lookup Error Types
//!
//! Structured error handling for the parts resolution engine using thiserror.
//! Every fallible component returns [`Result`]; the orchestrator absorbs tier
//! errors so that only the top-level [`LookupResult`](crate::orchestration::LookupResult)
//! reaches callers.

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid VIN {vin}: {reason}")]
    InvalidVin { vin: String, reason: String },

    #[error("VIN decode failed for {vin}: {message}")]
    Decode { vin: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Distributor {distributor} failed: {message}")]
    Distributor { distributor: String, message: String },

    #[error("Authentication with {distributor} failed: {message}")]
    Authentication { distributor: String, message: String },

    #[error("Credential vault error: {message}")]
    CredentialVault { message: String },

    #[error("EDI fallback failed: {message}")]
    Fallback { message: String },

    #[error("Escalation queue error: {message}")]
    Escalation { message: String },

    #[error("Invalid escalation transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Retry queue error: {message}")]
    RetryQueue { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl LookupError {
    pub fn distributor(distributor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Distributor {
            distributor: distributor.into(),
            message: message.into(),
        }
    }

    pub fn authentication(distributor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            distributor: distributor.into(),
            message: message.into(),
        }
    }

    /// Terminal errors abort a lookup before any tier runs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidVin { .. } | Self::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
