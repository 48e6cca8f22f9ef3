use serde::{Deserialize, Serialize};

use crate::constants::{VIN_LENGTH, VIN_PATTERN_LENGTH};
use crate::error::{LookupError, Result};

/// VehicleInfo is the decoded, immutable view of a VIN.
///
/// Produced once per lookup by the [`VehicleDecoder`](crate::decoder::VehicleDecoder)
/// and shared read-only with every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub vin: String,
    pub vin_pattern: String,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub body_style: Option<String>,
}

impl VehicleInfo {
    pub fn new(
        vin: impl Into<String>,
        year: i32,
        make: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let vin = normalize_vin(&vin.into());
        let vin_pattern = vin_pattern(&vin);
        Self {
            vin,
            vin_pattern,
            year,
            make: make.into(),
            model: model.into(),
            trim: None,
            body_style: None,
        }
    }

    pub fn with_trim(mut self, trim: impl Into<String>) -> Self {
        self.trim = Some(trim.into());
        self
    }

    pub fn with_body_style(mut self, body_style: impl Into<String>) -> Self {
        self.body_style = Some(body_style.into());
        self
    }

    /// Human-readable "2003 Honda Accord EX" label for logs and escalation tickets
    pub fn display_name(&self) -> String {
        match &self.trim {
            Some(trim) => format!("{} {} {} {}", self.year, self.make, self.model, trim),
            None => format!("{} {} {}", self.year, self.make, self.model),
        }
    }
}

/// Trim surrounding whitespace and upper-case
pub fn normalize_vin(vin: &str) -> String {
    vin.trim().to_ascii_uppercase()
}

/// First 11 characters of a normalized VIN (or the whole VIN when shorter)
pub fn vin_pattern(vin: &str) -> String {
    vin.chars().take(VIN_PATTERN_LENGTH).collect()
}

/// Validate a VIN's shape. Check digits are not verified; the decoder owns that.
pub fn validate_vin(vin: &str) -> Result<String> {
    let normalized = normalize_vin(vin);
    let invalid = |reason: &str| LookupError::InvalidVin {
        vin: normalized.clone(),
        reason: reason.to_string(),
    };

    if normalized.len() != VIN_LENGTH {
        return Err(invalid(&format!(
            "expected {VIN_LENGTH} characters, got {}",
            normalized.len()
        )));
    }
    if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid("contains non-alphanumeric characters"));
    }
    if normalized.chars().any(|c| matches!(c, 'I' | 'O' | 'Q')) {
        return Err(invalid("contains I, O or Q"));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vehicle_pattern_is_first_eleven_chars() {
        let vehicle = VehicleInfo::new("1hgcm82633a004352 ", 2003, "Honda", "Accord").with_trim("EX");
        assert_eq!(vehicle.vin, "1HGCM82633A004352");
        assert_eq!(vehicle.vin_pattern, "1HGCM82633A");
        assert_eq!(vehicle.display_name(), "2003 Honda Accord EX");
    }

    #[test]
    fn test_validate_vin() {
        assert_eq!(validate_vin(" 1hgcm82633a004352").unwrap(), "1HGCM82633A004352");
        assert!(validate_vin("1HGCM82633A00435").is_err());
        assert!(validate_vin("1HGCM82633A00435O").is_err());
        assert!(validate_vin("1HGCM82633A00435-").is_err());
    }

    proptest! {
        #[test]
        fn prop_pattern_is_prefix(vin in "[A-HJ-NPR-Z0-9]{17}") {
            let pattern = vin_pattern(&vin);
            prop_assert_eq!(pattern.len(), VIN_PATTERN_LENGTH);
            prop_assert!(vin.starts_with(&pattern));
            prop_assert!(validate_vin(&vin).is_ok());
        }
    }
}
