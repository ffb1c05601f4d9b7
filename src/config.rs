//! Profile configuration: regional density targets and seed packaging tables.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::estimator::RoundingPolicy;

pub const HYBRID: &str = "hybrid";
pub const OPEN_POLLINATED: &str = "open_pollinated";

fn default_germination_rate() -> f64 {
    0.75
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Target plant density (plants/acre) keyed by region name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionProfile(BTreeMap<String, f64>);

impl RegionProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, name: impl Into<String>, plants_per_acre: f64) -> Self {
        self.insert(name, plants_per_acre);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, plants_per_acre: f64) {
        self.0.insert(name.into(), plants_per_acre);
    }

    pub fn density(&self, region: &str) -> Option<f64> {
        self.0.get(region).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, density)| (name.as_str(), *density))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Seeds per packet keyed by seed type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedPackaging(BTreeMap<String, u64>);

impl SeedPackaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed_type(mut self, name: impl Into<String>, seeds_per_packet: u64) -> Self {
        self.insert(name, seeds_per_packet);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, seeds_per_packet: u64) {
        self.0.insert(name.into(), seeds_per_packet);
    }

    pub fn seeds_per_packet(&self, seed_type: &str) -> Option<u64> {
        self.0.get(seed_type).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, seeds)| (name.as_str(), *seeds))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Everything a calculation needs besides the field measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Germination rate used when a caller does not name one.
    #[serde(default = "default_germination_rate")]
    pub germination_rate: f64,
    #[serde(default)]
    pub packet_rounding: RoundingPolicy,
    pub regions: RegionProfile,
    pub seed_types: SeedPackaging,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("profile validation error: {0}")]
    Validation(String),
}

impl Profile {
    /// The western India profile the calculator ships with.
    pub fn builtin() -> Self {
        Self {
            name: "western_india".to_string(),
            description: Some("Regional density targets for Maharashtra and Gujarat".to_string()),
            germination_rate: default_germination_rate(),
            packet_rounding: RoundingPolicy::Up,
            regions: RegionProfile::new()
                .with_region("Maharashtra", 14_000.0)
                .with_region("Gujarat", 7_400.0),
            seed_types: SeedPackaging::new()
                .with_seed_type(HYBRID, 4_000)
                .with_seed_type(OPEN_POLLINATED, 22_300),
            logging: LoggingConfig::default(),
        }
    }

    /// Parses and validates a YAML profile document.
    pub fn parse_yaml(text: &str) -> Result<Self> {
        let profile: Profile = serde_yaml::from_str(text).context("Failed to parse profile")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize profile")
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.regions.is_empty() {
            return Err(ProfileError::Validation(
                "profile must define at least one region".to_string(),
            ));
        }
        for (name, density) in self.regions.iter() {
            if !(density.is_finite() && density > 0.0) {
                return Err(ProfileError::Validation(format!(
                    "region '{name}' density must be positive, got {density}"
                )));
            }
        }

        if self.seed_types.is_empty() {
            return Err(ProfileError::Validation(
                "profile must define at least one seed type".into(),
            ));
        }
        for (name, seeds) in self.seed_types.iter() {
            if seeds == 0 {
                return Err(ProfileError::Validation(format!(
                    "seed type '{name}' must hold at least one seed per packet"
                )));
            }
        }

        let rate = self.germination_rate;
        if !(rate.is_finite() && rate > 0.0 && rate <= 1.0) {
            return Err(ProfileError::Validation(format!(
                "default germination rate must be in (0, 1], got {rate}"
            )));
        }

        Ok(())
    }
}

pub struct ProfileLoader {
    base_dir: PathBuf,
}

impl ProfileLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Profile> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile file {}", path.display()))?;
        let profile = Profile::parse_yaml(&data)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        debug!(
            profile = %profile.name,
            regions = profile.regions.len(),
            seed_types = profile.seed_types.len(),
            "loaded profile"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profile_matches_observed_tables() {
        let profile = Profile::builtin();

        assert_eq!(profile.regions.density("Maharashtra"), Some(14_000.0));
        assert_eq!(profile.regions.density("Gujarat"), Some(7_400.0));
        assert_eq!(profile.seed_types.seeds_per_packet(HYBRID), Some(4_000));
        assert_eq!(profile.seed_types.seeds_per_packet(OPEN_POLLINATED), Some(22_300));
        assert_eq!(profile.packet_rounding, RoundingPolicy::Up);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn yaml_defaults_fill_optional_fields() {
        let profile = Profile::parse_yaml(
            "name: minimal\nregions:\n  Punjab: 9000\nseed_types:\n  hybrid: 4000\n",
        )
        .unwrap();

        assert_eq!(profile.germination_rate, 0.75);
        assert_eq!(profile.packet_rounding, RoundingPolicy::Up);
        assert_eq!(profile.logging.level, "info");
        assert_eq!(profile.description, None);
    }

    #[test]
    fn new_regions_need_no_code_change() {
        let yaml = "name: extended\nregions:\n  Maharashtra: 14000\n  Karnataka: 11000\nseed_types:\n  hybrid: 4000\n  heirloom: 500\n";
        let profile = Profile::parse_yaml(yaml).unwrap();

        assert_eq!(profile.regions.density("Karnataka"), Some(11_000.0));
        assert_eq!(profile.seed_types.seeds_per_packet("heirloom"), Some(500));
    }

    #[test]
    fn validation_rejects_bad_tables() {
        let mut profile = Profile::builtin();
        profile.regions.insert("Nowhere", 0.0);
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::Validation(_))
        ));

        let mut profile = Profile::builtin();
        profile.seed_types.insert("empty", 0);
        assert!(profile.validate().is_err());

        let mut profile = Profile::builtin();
        profile.germination_rate = 1.2;
        assert!(profile.validate().is_err());

        let mut profile = Profile::builtin();
        profile.regions = RegionProfile::new();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_preserves_tables() {
        let profile = Profile::builtin();
        let yaml = profile.to_yaml_string().unwrap();
        let parsed = Profile::parse_yaml(&yaml).unwrap();
        assert_eq!(parsed, profile);
    }
}
