use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::estimator::EstimateError;

/// Square meters in one acre.
pub const ACRE_TO_M2: f64 = 4046.86;

const CM_PER_M: f64 = 100.0;

/// Unit the spacing measurements were taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingUnit {
    Cm,
    M,
}

impl SpacingUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            SpacingUnit::Cm => "cm",
            SpacingUnit::M => "m",
        }
    }

    fn to_meters(self, value: f64) -> f64 {
        match self {
            SpacingUnit::Cm => value / CM_PER_M,
            SpacingUnit::M => value,
        }
    }
}

impl fmt::Display for SpacingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpacingUnit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cm" => Ok(SpacingUnit::Cm),
            "m" => Ok(SpacingUnit::M),
            other => Err(format!("unknown spacing unit '{other}' (expected 'cm' or 'm')")),
        }
    }
}

/// Converts row and plant spacing to meters.
pub fn normalize_spacing(
    row_spacing: f64,
    plant_spacing: f64,
    unit: SpacingUnit,
) -> Result<(f64, f64), EstimateError> {
    ensure_positive("row_spacing", row_spacing)?;
    ensure_positive("plant_spacing", plant_spacing)?;
    Ok((unit.to_meters(row_spacing), unit.to_meters(plant_spacing)))
}

pub(crate) fn ensure_positive(field: &str, value: f64) -> Result<(), EstimateError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EstimateError::InvalidInput(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}
