//! Seed and packet requirements for establishing a plant population.
//!
//! Every function here is pure: identical inputs give bit-identical outputs
//! and nothing is read from or written to the outside world.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Profile, RegionProfile};
use crate::units::{ensure_positive, normalize_spacing, SpacingUnit, ACRE_TO_M2};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown region '{0}'")]
    UnknownRegion(String),
    #[error("unknown seed type '{0}'")]
    UnknownSeedType(String),
    #[error("germination rate must be in (0, 1], got {0}")]
    InvalidRate(f64),
    #[error("area per plant is zero")]
    DivisionByZero,
    #[error("gap seeds are not computable with germination rate {0}")]
    UndefinedGapSeeds(f64),
}

impl EstimateError {
    /// Stable identifier for API consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            EstimateError::InvalidInput(_) => "invalid_input",
            EstimateError::UnknownRegion(_) => "unknown_region",
            EstimateError::UnknownSeedType(_) => "unknown_seed_type",
            EstimateError::InvalidRate(_) => "invalid_rate",
            EstimateError::DivisionByZero => "division_by_zero",
            EstimateError::UndefinedGapSeeds(_) => "undefined_gap_seeds",
        }
    }
}

/// How a fractional packet count becomes a whole number.
///
/// `Up` guarantees enough seed is bought and is used for every "needed"
/// figure. `Down` reports only the full packets a seed quantity fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingPolicy {
    #[default]
    Up,
    Down,
}

impl RoundingPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundingPolicy::Up => "up",
            RoundingPolicy::Down => "down",
        }
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" | "ceil" => Ok(RoundingPolicy::Up),
            "down" | "floor" => Ok(RoundingPolicy::Down),
            other => Err(format!("unknown rounding policy '{other}' (expected 'up' or 'down')")),
        }
    }
}

/// Field measurements and assumptions for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub region: String,
    pub spacing_unit: SpacingUnit,
    pub row_spacing: f64,
    pub plant_spacing: f64,
    pub land_area_acres: f64,
    pub seed_type: String,
    pub germination_rate: f64,
    #[serde(default)]
    pub mortality_count: u64,
    /// Overrides the profile's packet rounding when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_rounding: Option<RoundingPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub capacity_plants: f64,
    pub target_plants: f64,
    pub required_seeds: u64,
    pub required_packets: u64,
    pub gap_plants: f64,
    pub gap_seeds: u64,
    pub gap_packets: u64,
}

impl CalculationResult {
    /// Plants the regional target exceeds what the spacing can hold, if any.
    pub fn capacity_shortfall(&self) -> Option<f64> {
        let shortfall = self.target_plants - self.capacity_plants;
        (shortfall > 0.0).then_some(shortfall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapFill {
    pub gap_plants: f64,
    pub gap_seeds: u64,
    pub gap_packets: u64,
}

/// Plants a field holds when laid out on a rectangular grid.
pub fn estimate_capacity(row_m: f64, plant_m: f64, land_acres: f64) -> Result<f64, EstimateError> {
    ensure_positive("land_area_acres", land_acres)?;
    let area_per_plant = row_m * plant_m;
    if area_per_plant == 0.0 {
        return Err(EstimateError::DivisionByZero);
    }
    if !(area_per_plant.is_finite() && area_per_plant > 0.0) {
        return Err(EstimateError::InvalidInput(format!(
            "area per plant must be positive, got {area_per_plant}"
        )));
    }
    let plants_per_m2 = 1.0 / area_per_plant;
    let field_area_m2 = land_acres * ACRE_TO_M2;
    let capacity = plants_per_m2 * field_area_m2;
    if !capacity.is_finite() {
        return Err(EstimateError::InvalidInput(format!(
            "field of {land_acres} acres at {area_per_plant} m2 per plant has no finite capacity"
        )));
    }
    Ok(capacity)
}

pub fn target_plants(
    region: &str,
    land_acres: f64,
    regions: &RegionProfile,
) -> Result<f64, EstimateError> {
    ensure_positive("land_area_acres", land_acres)?;
    let density = regions
        .density(region)
        .ok_or_else(|| EstimateError::UnknownRegion(region.to_string()))?;
    Ok(density * land_acres)
}

/// Seeds to sow so that `target_plants` survive germination.
pub fn required_seeds(target_plants: f64, germination_rate: f64) -> Result<f64, EstimateError> {
    check_rate(germination_rate)?;
    Ok(target_plants / germination_rate)
}

pub fn required_packets(
    required_seeds: u64,
    seeds_per_packet: u64,
    rounding: RoundingPolicy,
) -> Result<u64, EstimateError> {
    if seeds_per_packet == 0 {
        return Err(EstimateError::InvalidInput(
            "seeds_per_packet must be at least 1".to_string(),
        ));
    }
    Ok(match rounding {
        RoundingPolicy::Up => required_seeds.div_ceil(seeds_per_packet),
        RoundingPolicy::Down => required_seeds / seeds_per_packet,
    })
}

/// Plants lost to germination failure and mortality, and the seed needed to
/// re-sow them. The gap is clamped to `[0, capacity_plants]`; seeds and
/// packets always round up.
pub fn gap_fill(
    capacity_plants: f64,
    germination_rate: f64,
    mortality_count: u64,
    seeds_per_packet: u64,
) -> Result<GapFill, EstimateError> {
    if !(capacity_plants.is_finite() && capacity_plants >= 0.0) {
        return Err(EstimateError::InvalidInput(format!(
            "capacity_plants must be non-negative, got {capacity_plants}"
        )));
    }
    if germination_rate.is_nan() || germination_rate <= 0.0 {
        return Err(EstimateError::UndefinedGapSeeds(germination_rate));
    }
    check_rate(germination_rate)?;

    let expected_survivors = capacity_plants * germination_rate;
    let initial_shortfall = capacity_plants - expected_survivors;
    let gap_plants = (initial_shortfall + mortality_count as f64).clamp(0.0, capacity_plants);
    let gap_seeds = to_count("gap_seeds", gap_plants / germination_rate)
        .map_err(|_| EstimateError::UndefinedGapSeeds(germination_rate))?;
    let gap_packets = required_packets(gap_seeds, seeds_per_packet, RoundingPolicy::Up)?;

    Ok(GapFill {
        gap_plants,
        gap_seeds,
        gap_packets,
    })
}

/// Runs the whole estimate for one field against a profile's tables.
pub fn calculate(
    profile: &Profile,
    request: &CalculationRequest,
) -> Result<CalculationResult, EstimateError> {
    check_rate(request.germination_rate)?;
    let (row_m, plant_m) = normalize_spacing(
        request.row_spacing,
        request.plant_spacing,
        request.spacing_unit,
    )?;
    let seeds_per_packet = profile
        .seed_types
        .seeds_per_packet(&request.seed_type)
        .ok_or_else(|| EstimateError::UnknownSeedType(request.seed_type.clone()))?;
    let rounding = request.packet_rounding.unwrap_or(profile.packet_rounding);

    let capacity_plants = estimate_capacity(row_m, plant_m, request.land_area_acres)?;
    let target_plants = target_plants(&request.region, request.land_area_acres, &profile.regions)?;
    let required_seeds = to_count(
        "required_seeds",
        required_seeds(target_plants, request.germination_rate)?,
    )?;
    let required_packets = required_packets(required_seeds, seeds_per_packet, rounding)?;
    let gap = gap_fill(
        capacity_plants,
        request.germination_rate,
        request.mortality_count,
        seeds_per_packet,
    )?;

    Ok(CalculationResult {
        capacity_plants,
        target_plants,
        required_seeds,
        required_packets,
        gap_plants: gap.gap_plants,
        gap_seeds: gap.gap_seeds,
        gap_packets: gap.gap_packets,
    })
}

/// Rounds a non-negative seed quantity up to a whole count. Quantities with
/// no `u64` representation are rejected rather than saturated.
pub fn to_count(field: &str, value: f64) -> Result<u64, EstimateError> {
    let rounded = value.ceil();
    // u64::MAX as f64 is 2^64, one past the largest count
    if rounded.is_finite() && rounded >= 0.0 && rounded < u64::MAX as f64 {
        Ok(rounded as u64)
    } else {
        Err(EstimateError::InvalidInput(format!(
            "{field} of {value} cannot be represented as a seed count"
        )))
    }
}

fn check_rate(germination_rate: f64) -> Result<(), EstimateError> {
    if germination_rate.is_finite() && germination_rate > 0.0 && germination_rate <= 1.0 {
        Ok(())
    } else {
        Err(EstimateError::InvalidRate(germination_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HYBRID;

    fn request() -> CalculationRequest {
        CalculationRequest {
            region: "Maharashtra".into(),
            spacing_unit: SpacingUnit::Cm,
            row_spacing: 90.0,
            plant_spacing: 30.0,
            land_area_acres: 1.0,
            seed_type: HYBRID.into(),
            germination_rate: 0.75,
            mortality_count: 0,
            packet_rounding: None,
        }
    }

    #[test]
    fn zero_area_per_plant_is_division_by_zero() {
        assert_eq!(
            estimate_capacity(0.0, 0.3, 1.0),
            Err(EstimateError::DivisionByZero)
        );
        assert!(matches!(
            estimate_capacity(-0.9, 0.3, 1.0),
            Err(EstimateError::InvalidInput(_))
        ));
        assert!(matches!(
            estimate_capacity(0.9, 0.3, 0.0),
            Err(EstimateError::InvalidInput(_))
        ));
    }

    #[test]
    fn packets_round_per_policy() {
        assert_eq!(required_packets(18_667, 4_000, RoundingPolicy::Up), Ok(5));
        assert_eq!(required_packets(18_667, 4_000, RoundingPolicy::Down), Ok(4));
        assert_eq!(required_packets(8_000, 4_000, RoundingPolicy::Up), Ok(2));
        assert_eq!(required_packets(0, 4_000, RoundingPolicy::Up), Ok(0));
        assert!(matches!(
            required_packets(10, 0, RoundingPolicy::Up),
            Err(EstimateError::InvalidInput(_))
        ));
    }

    #[test]
    fn rates_outside_unit_interval_are_rejected() {
        for rate in [0.0, -0.1, 1.01, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(required_seeds(14_000.0, rate), Err(EstimateError::InvalidRate(_))),
                "rate {rate}"
            );
        }
        assert_eq!(required_seeds(14_000.0, 1.0), Ok(14_000.0));
    }

    #[test]
    fn gap_fill_reports_undefined_seeds_for_zero_rate() {
        assert_eq!(
            gap_fill(10_000.0, 0.0, 0, 4_000),
            Err(EstimateError::UndefinedGapSeeds(0.0))
        );
        assert!(matches!(
            gap_fill(10_000.0, -0.5, 0, 4_000),
            Err(EstimateError::UndefinedGapSeeds(_))
        ));
    }

    #[test]
    fn gap_is_clamped_to_capacity() {
        let gap = gap_fill(1_000.0, 0.9, 50_000, 4_000).unwrap();
        assert_eq!(gap.gap_plants, 1_000.0);
        assert_eq!(gap.gap_seeds, 1_112);
        assert_eq!(gap.gap_packets, 1);
    }

    #[test]
    fn full_germination_without_mortality_leaves_no_gap() {
        let gap = gap_fill(12_345.0, 1.0, 0, 4_000).unwrap();
        assert_eq!(gap.gap_plants, 0.0);
        assert_eq!(gap.gap_seeds, 0);
        assert_eq!(gap.gap_packets, 0);
    }

    #[test]
    fn request_rounding_overrides_profile() {
        let profile = Profile::builtin();
        let mut req = request();
        req.packet_rounding = Some(RoundingPolicy::Down);

        let result = calculate(&profile, &req).unwrap();
        assert_eq!(result.required_seeds, 18_667);
        assert_eq!(result.required_packets, 4);
    }

    #[test]
    fn unknown_seed_type_fails_the_whole_calculation() {
        let mut req = request();
        req.seed_type = "heirloom".into();
        assert_eq!(
            calculate(&Profile::builtin(), &req),
            Err(EstimateError::UnknownSeedType("heirloom".into()))
        );
    }

    #[test]
    fn capacity_shortfall_only_when_target_exceeds_capacity() {
        let profile = Profile::builtin();
        let dense = calculate(&profile, &request()).unwrap();
        assert_eq!(dense.capacity_shortfall(), None);

        let mut sparse = request();
        sparse.row_spacing = 180.0;
        let result = calculate(&profile, &sparse).unwrap();
        let shortfall = result.capacity_shortfall().unwrap();
        assert!((shortfall - (14_000.0 - 4046.86 / 0.54)).abs() < 1e-6);
    }

    #[test]
    fn counts_reject_values_without_u64_representation() {
        assert_eq!(to_count("seeds", 18_666.2), Ok(18_667));
        assert_eq!(to_count("seeds", 0.0), Ok(0));
        for value in [f64::INFINITY, f64::NAN, -1.0, u64::MAX as f64, 1e20] {
            assert!(
                matches!(to_count("seeds", value), Err(EstimateError::InvalidInput(_))),
                "{value}"
            );
        }
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(EstimateError::InvalidRate(0.0).kind(), "invalid_rate");
        assert_eq!(EstimateError::UnknownRegion("x".into()).kind(), "unknown_region");
        assert_eq!(EstimateError::UndefinedGapSeeds(0.0).kind(), "undefined_gap_seeds");
    }
}
