//! # Orchestration Types
//!
//! Request/result types of the lookup cascade and the [`PartsTier`] seam that
//! tiers 2 and 3 sit behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::ALL_POSITIONS;
use crate::error::{LookupError, Result};
use crate::models::{EscalationPriority, GlassPartResult, GlassPosition, SourcedPart, VehicleInfo};

/// What one external tier returned for a single call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLookupResult {
    pub success: bool,
    pub parts: Vec<SourcedPart>,
    pub source: String,
    pub duration_ms: u64,
}

impl TierLookupResult {
    pub fn empty(source: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            parts: Vec::new(),
            source: source.into(),
            duration_ms,
        }
    }

    pub fn found(source: impl Into<String>, parts: Vec<SourcedPart>, duration_ms: u64) -> Self {
        Self {
            success: !parts.is_empty(),
            parts,
            source: source.into(),
            duration_ms,
        }
    }
}

/// An external resolution tier. Called at most once per cascade with every
/// position still missing at that point.
#[async_trait]
pub trait PartsTier: Send + Sync {
    /// Source identifier used in logs and attempt logs
    fn tier_name(&self) -> &str;

    async fn lookup(
        &self,
        vehicle: &VehicleInfo,
        positions: &[GlassPosition],
    ) -> Result<TierLookupResult>;
}

/// Requested positions: an explicit subset or the `"all"` shorthand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPositionSelector", into = "RawPositionSelector")]
pub enum PositionSelector {
    All,
    Explicit(Vec<GlassPosition>),
}

impl PositionSelector {
    /// Parse caller-supplied strings; any `"all"` entry selects the full set
    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        if values.iter().any(|v| v.as_ref() == "all") {
            return Ok(PositionSelector::All);
        }
        values
            .iter()
            .map(|v| v.as_ref().parse::<GlassPosition>())
            .collect::<Result<Vec<_>>>()
            .map(PositionSelector::Explicit)
    }

    /// Concrete positions, deduplicated with first-seen order kept
    pub fn expand(&self) -> Vec<GlassPosition> {
        match self {
            PositionSelector::All => ALL_POSITIONS.to_vec(),
            PositionSelector::Explicit(positions) => {
                let mut expanded = Vec::with_capacity(positions.len());
                for position in positions {
                    if !expanded.contains(position) {
                        expanded.push(*position);
                    }
                }
                expanded
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPositionSelector {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<RawPositionSelector> for PositionSelector {
    type Error = LookupError;

    fn try_from(raw: RawPositionSelector) -> Result<Self> {
        match raw {
            RawPositionSelector::Keyword(keyword) => PositionSelector::from_strings(&[keyword]),
            RawPositionSelector::List(list) => PositionSelector::from_strings(&list),
        }
    }
}

impl From<PositionSelector> for RawPositionSelector {
    fn from(selector: PositionSelector) -> Self {
        match selector {
            PositionSelector::All => RawPositionSelector::Keyword("all".to_string()),
            PositionSelector::Explicit(positions) => RawPositionSelector::List(
                positions.iter().map(|p| p.as_str().to_string()).collect(),
            ),
        }
    }
}

/// Input to [`LookupOrchestrator::lookup`](super::LookupOrchestrator::lookup)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub vin: String,
    pub glass_positions: PositionSelector,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub customer_context: serde_json::Value,
    #[serde(default)]
    pub priority: Option<EscalationPriority>,
}

impl LookupRequest {
    pub fn new(vin: impl Into<String>, glass_positions: PositionSelector) -> Self {
        Self {
            vin: vin.into(),
            glass_positions,
            transaction_id: None,
            customer_context: serde_json::Value::Null,
            priority: None,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn with_customer_context(mut self, context: serde_json::Value) -> Self {
        self.customer_context = context;
        self
    }

    pub fn with_priority(mut self, priority: EscalationPriority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// The single object a calling business transaction acts on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub success: bool,
    pub vehicle: Option<VehicleInfo>,
    pub parts: Vec<GlassPartResult>,
    pub resolved_by_tier: u8,
    pub resolved_by_source: String,
    pub duration_ms: u64,
    pub cached: bool,
    pub unresolved_positions: Vec<GlassPosition>,
    pub error: Option<String>,
}

impl LookupResult {
    /// True when some positions are waiting on a human researcher
    pub fn pending_manual_research(&self) -> bool {
        self.vehicle.is_some() && !self.unresolved_positions.is_empty()
    }
}

/// Per-tier wall time recorded into the audit row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTimings {
    pub cache_ms: Option<u64>,
    pub distributor_ms: Option<u64>,
    pub fallback_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expands_to_six_positions() {
        let positions = PositionSelector::All.expand();
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0], GlassPosition::Windshield);
        assert_eq!(positions[1], GlassPosition::BackGlass);
        assert!(!positions.contains(&GlassPosition::Sunroof));
    }

    #[test]
    fn test_explicit_dedupes_in_order() {
        let selector = PositionSelector::Explicit(vec![
            GlassPosition::BackGlass,
            GlassPosition::Windshield,
            GlassPosition::BackGlass,
        ]);
        assert_eq!(
            selector.expand(),
            vec![GlassPosition::BackGlass, GlassPosition::Windshield]
        );
    }

    #[test]
    fn test_from_strings() {
        assert_eq!(
            PositionSelector::from_strings(&["windshield", "all"]).unwrap(),
            PositionSelector::All
        );
        assert_eq!(
            PositionSelector::from_strings(&["door_fl"]).unwrap(),
            PositionSelector::Explicit(vec![GlassPosition::DoorFrontLeft])
        );
        assert!(PositionSelector::from_strings(&["hood"]).is_err());
    }

    #[test]
    fn test_request_deserializes_all_keyword_and_lists() {
        let request: LookupRequest = serde_json::from_value(serde_json::json!({
            "vin": "1HGCM82633A004352",
            "glass_positions": "all",
            "transaction_id": "txn-42",
            "priority": "urgent"
        }))
        .unwrap();
        assert_eq!(request.glass_positions, PositionSelector::All);
        assert_eq!(request.priority, Some(EscalationPriority::Urgent));

        let request: LookupRequest = serde_json::from_value(serde_json::json!({
            "vin": "1HGCM82633A004352",
            "glass_positions": ["windshield", "back_glass"]
        }))
        .unwrap();
        assert_eq!(
            request.glass_positions.expand(),
            vec![GlassPosition::Windshield, GlassPosition::BackGlass]
        );
        assert_eq!(request.customer_context, serde_json::Value::Null);
    }
}
