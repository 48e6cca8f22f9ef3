use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{confidence, sources};
use crate::error::LookupError;

/// Physical location of a glass panel on the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GlassPosition {
    #[serde(rename = "windshield")]
    Windshield,
    #[serde(rename = "back_glass")]
    BackGlass,
    #[serde(rename = "door_fl")]
    DoorFrontLeft,
    #[serde(rename = "door_fr")]
    DoorFrontRight,
    #[serde(rename = "door_rl")]
    DoorRearLeft,
    #[serde(rename = "door_rr")]
    DoorRearRight,
    #[serde(rename = "vent_fl")]
    VentFrontLeft,
    #[serde(rename = "vent_fr")]
    VentFrontRight,
    #[serde(rename = "vent_rl")]
    VentRearLeft,
    #[serde(rename = "vent_rr")]
    VentRearRight,
    #[serde(rename = "quarter_left")]
    QuarterLeft,
    #[serde(rename = "quarter_right")]
    QuarterRight,
    #[serde(rename = "sunroof")]
    Sunroof,
}

impl GlassPosition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            GlassPosition::Windshield => "windshield",
            GlassPosition::BackGlass => "back_glass",
            GlassPosition::DoorFrontLeft => "door_fl",
            GlassPosition::DoorFrontRight => "door_fr",
            GlassPosition::DoorRearLeft => "door_rl",
            GlassPosition::DoorRearRight => "door_rr",
            GlassPosition::VentFrontLeft => "vent_fl",
            GlassPosition::VentFrontRight => "vent_fr",
            GlassPosition::VentRearLeft => "vent_rl",
            GlassPosition::VentRearRight => "vent_rr",
            GlassPosition::QuarterLeft => "quarter_left",
            GlassPosition::QuarterRight => "quarter_right",
            GlassPosition::Sunroof => "sunroof",
        }
    }
}

impl fmt::Display for GlassPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlassPosition {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let position = match s {
            "windshield" => GlassPosition::Windshield,
            "back_glass" => GlassPosition::BackGlass,
            "door_fl" => GlassPosition::DoorFrontLeft,
            "door_fr" => GlassPosition::DoorFrontRight,
            "door_rl" => GlassPosition::DoorRearLeft,
            "door_rr" => GlassPosition::DoorRearRight,
            "vent_fl" => GlassPosition::VentFrontLeft,
            "vent_fr" => GlassPosition::VentFrontRight,
            "vent_rl" => GlassPosition::VentRearLeft,
            "vent_rr" => GlassPosition::VentRearRight,
            "quarter_left" => GlassPosition::QuarterLeft,
            "quarter_right" => GlassPosition::QuarterRight,
            "sunroof" => GlassPosition::Sunroof,
            other => {
                return Err(LookupError::NotFound {
                    entity: "glass position",
                    id: other.to_string(),
                })
            }
        };
        Ok(position)
    }
}

/// Comma-joined position list as stored in audit rows and error summaries
pub fn join_positions(positions: &[GlassPosition]) -> String {
    positions
        .iter()
        .map(GlassPosition::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Price quote attached to a resolved part; `cost` is in minor currency units (cents)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPrice {
    pub cost: i64,
    pub source: String,
    pub as_of_date: NaiveDate,
}

/// A resolved catalog part, produced by any tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlassPartResult {
    pub nags_part_number: String,
    pub nags_part_number_alt: Option<String>,
    pub glass_position: GlassPosition,
    pub features: Vec<String>,
    pub price: Option<PartPrice>,
    pub description: Option<String>,
}

impl GlassPartResult {
    pub fn new(nags_part_number: impl Into<String>, glass_position: GlassPosition) -> Self {
        Self {
            nags_part_number: nags_part_number.into(),
            nags_part_number_alt: None,
            glass_position,
            features: Vec::new(),
            price: None,
            description: None,
        }
    }

    pub fn with_price(mut self, cost: i64, source: impl Into<String>, as_of_date: NaiveDate) -> Self {
        self.price = Some(PartPrice {
            cost,
            source: source.into(),
            as_of_date,
        });
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.nags_part_number_alt = Some(alt.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Which tier produced a part
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartSource {
    /// A scraped or API distributor, identified by its adapter id
    Distributor(String),
    EdiFallback,
    Manual,
}

impl PartSource {
    pub fn as_str(&self) -> &str {
        match self {
            PartSource::Distributor(id) => id,
            PartSource::EdiFallback => sources::OMEGA,
            PartSource::Manual => sources::MANUAL,
        }
    }
}

impl fmt::Display for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source plus any uncertainty the source declared about its own answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: PartSource,
    pub declared_confidence: Option<u8>,
}

impl Provenance {
    pub fn distributor(id: impl Into<String>) -> Self {
        Self {
            source: PartSource::Distributor(id.into()),
            declared_confidence: None,
        }
    }

    pub fn edi_fallback() -> Self {
        Self {
            source: PartSource::EdiFallback,
            declared_confidence: None,
        }
    }

    pub fn manual() -> Self {
        Self {
            source: PartSource::Manual,
            declared_confidence: None,
        }
    }

    pub fn with_declared_confidence(mut self, declared: u8) -> Self {
        self.declared_confidence = Some(declared);
        self
    }

    /// Source-derived confidence. A declared value can only lower a
    /// distributor's ceiling; EDI and manual scores are fixed.
    pub fn confidence(&self) -> u8 {
        match &self.source {
            PartSource::EdiFallback => confidence::EDI_FALLBACK,
            PartSource::Manual => confidence::MANUAL,
            PartSource::Distributor(_) => self
                .declared_confidence
                .map_or(confidence::DISTRIBUTOR, |declared| {
                    declared.min(confidence::DISTRIBUTOR)
                }),
        }
    }

    pub fn verified(&self) -> bool {
        matches!(self.source, PartSource::EdiFallback)
    }
}

/// A part together with where it came from, as returned by tiers 2 and 3
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedPart {
    pub part: GlassPartResult,
    pub provenance: Provenance,
}

impl SourcedPart {
    pub fn new(part: GlassPartResult, provenance: Provenance) -> Self {
        Self { part, provenance }
    }
}
