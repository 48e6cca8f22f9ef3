use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::glass_part::GlassPosition;
use super::vehicle::VehicleInfo;
use crate::error::LookupError;

/// Research urgency, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EscalationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl EscalationPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EscalationPriority::Low => "low",
            EscalationPriority::Normal => "normal",
            EscalationPriority::High => "high",
            EscalationPriority::Urgent => "urgent",
        }
    }

    /// Numeric rank persisted alongside the label so the queue can order by it
    pub const fn rank(&self) -> i16 {
        match self {
            EscalationPriority::Low => 0,
            EscalationPriority::Normal => 1,
            EscalationPriority::High => 2,
            EscalationPriority::Urgent => 3,
        }
    }
}

impl fmt::Display for EscalationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationPriority {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(EscalationPriority::Low),
            "normal" => Ok(EscalationPriority::Normal),
            "high" => Ok(EscalationPriority::High),
            "urgent" => Ok(EscalationPriority::Urgent),
            other => Err(LookupError::NotFound {
                entity: "escalation priority",
                id: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    InProgress,
    Resolved,
}

impl EscalationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::Pending => "pending",
            EscalationStatus::InProgress => "in_progress",
            EscalationStatus::Resolved => "resolved",
        }
    }

    pub fn can_transition_to(&self, next: EscalationStatus) -> bool {
        matches!(
            (self, next),
            (EscalationStatus::Pending, EscalationStatus::InProgress)
                | (EscalationStatus::Pending, EscalationStatus::Resolved)
                | (EscalationStatus::InProgress, EscalationStatus::Resolved)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EscalationStatus::Resolved)
    }
}

impl fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationStatus {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EscalationStatus::Pending),
            "in_progress" => Ok(EscalationStatus::InProgress),
            "resolved" => Ok(EscalationStatus::Resolved),
            other => Err(LookupError::NotFound {
                entity: "escalation status",
                id: other.to_string(),
            }),
        }
    }
}

/// One line of the attempt log: which tier was tried and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptLogEntry {
    pub tier: u8,
    pub source: String,
    pub outcome: String,
    pub timestamp: DateTime<Utc>,
}

impl AttemptLogEntry {
    pub fn new(tier: u8, source: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            tier,
            source: source.into(),
            outcome: outcome.into(),
            timestamp: Utc::now(),
        }
    }
}

/// EscalationEntry is a batch of positions no automated tier could resolve.
/// Maps to the `manual_escalation_queue` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EscalationEntry {
    pub id: Uuid,
    pub vin: String,
    pub glass_positions: Json<Vec<GlassPosition>>,
    pub vehicle_snapshot: Json<VehicleInfo>,
    pub transaction_id: Option<String>,
    pub customer_context: Json<serde_json::Value>,
    pub priority: String,
    pub priority_rank: i16,
    pub attempt_log: Json<Vec<AttemptLogEntry>>,
    pub status: String,
    pub resolved_nags_number: Option<String>,
    pub resolved_by: Option<String>,
    pub resolution_source: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EscalationEntry {
    pub fn status(&self) -> Result<EscalationStatus, LookupError> {
        self.status.parse()
    }

    pub fn priority(&self) -> Result<EscalationPriority, LookupError> {
        self.priority.parse()
    }

    pub fn positions(&self) -> &[GlassPosition] {
        &self.glass_positions.0
    }
}

/// New escalation entry for creation; always starts out pending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEscalationEntry {
    pub vehicle: VehicleInfo,
    pub glass_positions: Vec<GlassPosition>,
    pub transaction_id: Option<String>,
    pub customer_context: serde_json::Value,
    pub priority: EscalationPriority,
    pub attempt_log: Vec<AttemptLogEntry>,
}

impl NewEscalationEntry {
    /// Materialize the row as it will be persisted
    pub fn into_entry(self) -> EscalationEntry {
        let now = Utc::now();
        EscalationEntry {
            id: Uuid::new_v4(),
            vin: self.vehicle.vin.clone(),
            glass_positions: Json(self.glass_positions),
            vehicle_snapshot: Json(self.vehicle),
            transaction_id: self.transaction_id,
            customer_context: Json(self.customer_context),
            priority: self.priority.as_str().to_string(),
            priority_rank: self.priority.rank(),
            attempt_log: Json(self.attempt_log),
            status: EscalationStatus::Pending.as_str().to_string(),
            resolved_nags_number: None,
            resolved_by: None,
            resolution_source: None,
            resolution_notes: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a human researcher fills in when closing an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationResolution {
    pub resolved_nags_number: String,
    pub resolved_by: String,
    pub resolution_source: String,
    pub resolution_notes: Option<String>,
}
