use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryEntryStatus {
    Pending,
    Completed,
    DeadLetter,
}

impl RetryEntryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RetryEntryStatus::Pending => "pending",
            RetryEntryStatus::Completed => "completed",
            RetryEntryStatus::DeadLetter => "dead_letter",
        }
    }
}

impl fmt::Display for RetryEntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RetryEntry is a durable record of an operation to re-drive later.
/// Maps to the `retry_queue` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RetryEntry {
    pub id: Uuid,
    pub operation_type: String,
    pub payload: Json<serde_json::Value>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_retry_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub status: String,
    pub dead_letter_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RetryEntry {
    pub fn new(operation_type: impl Into<String>, payload: serde_json::Value, max_attempts: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            operation_type: operation_type.into(),
            payload: Json(payload),
            attempts: 0,
            max_attempts,
            next_retry_at: now,
            last_error: None,
            status: RetryEntryStatus::Pending.as_str().to_string(),
            dead_letter_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == RetryEntryStatus::Pending.as_str() && self.next_retry_at <= now
    }
}

/// Partial update applied by the worker after an attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEntryUpdate {
    pub attempts: i32,
    pub status: RetryEntryStatus,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
