//! Distributor position vocabulary → canonical [`GlassPosition`].
//!
//! Portals describe openings in free text ("Front", "Windshield Solar",
//! "LH Rear Door", "Backlite"). Mapping is best-effort keyword matching.
//! Anything that cannot be classified falls back to `Windshield` and is logged
//! at debug level. The fallback is lossy: an unrecognised label is misfiled
//! rather than reported unresolved.

use tracing::debug;

use crate::models::GlassPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axle {
    Front,
    Rear,
}

/// Map a distributor label to a canonical position, defaulting to windshield
pub fn map_position(raw: &str) -> GlassPosition {
    classify_position(raw).unwrap_or_else(|| {
        debug!(raw = %raw, "Unmapped distributor position, defaulting to windshield");
        GlassPosition::Windshield
    })
}

/// Keyword classification; `None` when the label names no recognisable opening
pub(crate) fn classify_position(raw: &str) -> Option<GlassPosition> {
    let normalized = raw.trim().to_ascii_lowercase();
    if let Ok(canonical) = normalized.parse::<GlassPosition>() {
        return Some(canonical);
    }

    let tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |word: &str| tokens.iter().any(|t| *t == word);
    let has_prefix = |prefix: &str| tokens.iter().any(|t| t.starts_with(prefix));

    let side = if has("left") || has("lh") || has("driver") || has("lf") || has("lr") {
        Some(Side::Left)
    } else if has("right") || has("rh") || has("passenger") || has("rf") || has("rr") {
        Some(Side::Right)
    } else {
        None
    };
    let axle = if has("rear") || has("lr") || has("rr") {
        Some(Axle::Rear)
    } else if has("front") || has("lf") || has("rf") {
        Some(Axle::Front)
    } else {
        None
    };

    if has_prefix("door") {
        // doors without a side are ambiguous
        return match (axle.unwrap_or(Axle::Front), side?) {
            (Axle::Front, Side::Left) => Some(GlassPosition::DoorFrontLeft),
            (Axle::Front, Side::Right) => Some(GlassPosition::DoorFrontRight),
            (Axle::Rear, Side::Left) => Some(GlassPosition::DoorRearLeft),
            (Axle::Rear, Side::Right) => Some(GlassPosition::DoorRearRight),
        };
    }

    if has_prefix("vent") {
        return match (axle.unwrap_or(Axle::Front), side?) {
            (Axle::Front, Side::Left) => Some(GlassPosition::VentFrontLeft),
            (Axle::Front, Side::Right) => Some(GlassPosition::VentFrontRight),
            (Axle::Rear, Side::Left) => Some(GlassPosition::VentRearLeft),
            (Axle::Rear, Side::Right) => Some(GlassPosition::VentRearRight),
        };
    }

    if has_prefix("quarter") {
        return match side? {
            Side::Left => Some(GlassPosition::QuarterLeft),
            Side::Right => Some(GlassPosition::QuarterRight),
        };
    }

    if has_prefix("sunroof") || has_prefix("moonroof") || has("roof") {
        return Some(GlassPosition::Sunroof);
    }

    // a bare "rear" with no side names the back glass
    if has("back")
        || has_prefix("backli")
        || has("backglass")
        || (axle == Some(Axle::Rear) && side.is_none())
    {
        return Some(GlassPosition::BackGlass);
    }

    if has_prefix("wind") || (axle == Some(Axle::Front) && side.is_none()) {
        return Some(GlassPosition::Windshield);
    }

    None
}

/// Label sent to portals that search by opening name
pub fn position_label(position: GlassPosition) -> &'static str {
    match position {
        GlassPosition::Windshield => "Windshield",
        GlassPosition::BackGlass => "Back Glass",
        GlassPosition::DoorFrontLeft => "Left Front Door",
        GlassPosition::DoorFrontRight => "Right Front Door",
        GlassPosition::DoorRearLeft => "Left Rear Door",
        GlassPosition::DoorRearRight => "Right Rear Door",
        GlassPosition::VentFrontLeft => "Left Front Vent",
        GlassPosition::VentFrontRight => "Right Front Vent",
        GlassPosition::VentRearLeft => "Left Rear Vent",
        GlassPosition::VentRearRight => "Right Rear Vent",
        GlassPosition::QuarterLeft => "Left Quarter",
        GlassPosition::QuarterRight => "Right Quarter",
        GlassPosition::Sunroof => "Sunroof",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_windshield_vocabulary() {
        assert_eq!(map_position("Windshield"), GlassPosition::Windshield);
        assert_eq!(map_position("WINDSHIELD SOLAR"), GlassPosition::Windshield);
        assert_eq!(map_position("Front"), GlassPosition::Windshield);
        assert_eq!(map_position("windscreen"), GlassPosition::Windshield);
    }

    #[test]
    fn test_back_glass_vocabulary() {
        assert_eq!(map_position("Back Glass"), GlassPosition::BackGlass);
        assert_eq!(map_position("Backlite Heated"), GlassPosition::BackGlass);
        assert_eq!(map_position("Rear Window"), GlassPosition::BackGlass);
        assert_eq!(map_position("back_glass"), GlassPosition::BackGlass);
    }

    #[test]
    fn test_side_glass_vocabulary() {
        assert_eq!(map_position("LH Front Door"), GlassPosition::DoorFrontLeft);
        assert_eq!(map_position("Right Rear Door"), GlassPosition::DoorRearRight);
        assert_eq!(map_position("Door - Passenger"), GlassPosition::DoorFrontRight);
        assert_eq!(map_position("LR Door"), GlassPosition::DoorRearLeft);
        assert_eq!(map_position("Left Front Vent"), GlassPosition::VentFrontLeft);
        assert_eq!(map_position("Quarter RH"), GlassPosition::QuarterRight);
        assert_eq!(map_position("Moonroof"), GlassPosition::Sunroof);
    }

    #[test]
    fn test_ambiguous_labels_default_to_windshield() {
        assert_eq!(map_position(""), GlassPosition::Windshield);
        assert_eq!(map_position("Door"), GlassPosition::Windshield);
        assert_eq!(map_position("Glass"), GlassPosition::Windshield);
        assert_eq!(map_position("Quarter"), GlassPosition::Windshield);
    }

    #[test]
    fn test_unrecognised_labels_are_unclassified() {
        for label in ["", "Door", "Glass", "Quarter", "LH Front", "Hood"] {
            assert_eq!(classify_position(label), None, "{label}");
            assert_eq!(map_position(label), GlassPosition::Windshield);
        }
        assert_eq!(classify_position("Front"), Some(GlassPosition::Windshield));
    }

    #[test]
    fn test_bare_rear_is_back_glass() {
        assert_eq!(map_position("Rear"), GlassPosition::BackGlass);
        assert_eq!(map_position("REAR HEATED"), GlassPosition::BackGlass);
        assert_eq!(map_position("LH Rear Door"), GlassPosition::DoorRearLeft);
    }

    #[test]
    fn test_labels_map_back_to_their_position() {
        for position in crate::constants::ALL_POSITIONS {
            assert_eq!(map_position(position_label(position)), position);
        }
    }

    proptest! {
        #[test]
        fn prop_mapping_never_panics(label in ".{0,40}") {
            let _ = map_position(&label);
        }
    }
}
