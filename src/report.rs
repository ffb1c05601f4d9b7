use std::str::FromStr;

use anyhow::Context;
use serde::Serialize;

use crate::config::Profile;
use crate::estimator::{CalculationRequest, CalculationResult, EstimateError, RoundingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// A finished calculation together with the inputs that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    pub profile: &'a str,
    pub request: &'a CalculationRequest,
    pub packet_rounding: RoundingPolicy,
    pub seeds_per_packet: u64,
    pub result: &'a CalculationResult,
}

impl<'a> Report<'a> {
    pub fn new(
        profile: &'a Profile,
        request: &'a CalculationRequest,
        result: &'a CalculationResult,
    ) -> Result<Self, EstimateError> {
        let seeds_per_packet = profile
            .seed_types
            .seeds_per_packet(&request.seed_type)
            .ok_or_else(|| EstimateError::UnknownSeedType(request.seed_type.clone()))?;
        Ok(Self {
            profile: &profile.name,
            request,
            packet_rounding: request.packet_rounding.unwrap_or(profile.packet_rounding),
            seeds_per_packet,
            result,
        })
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to encode report as JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(self).context("Failed to encode report as YAML")
            }
        }
    }

    fn to_text(&self) -> String {
        let request = self.request;
        let result = self.result;
        let packets_label = match self.packet_rounding {
            RoundingPolicy::Up => "Seed packets needed",
            RoundingPolicy::Down => "Full seed packets",
        };
        let warning = match result.capacity_shortfall() {
            Some(shortfall) => format!(
                "\n  Warning: spacing holds {} fewer plants than the regional target\n",
                group_thousands(shortfall.ceil() as u64)
            ),
            None => String::new(),
        };

        format!(
            "Plant Population & Seed Requirement [{profile}]
  Field: {acres} acres in {region}, {row} x {plant} {unit} spacing, {seed_type} seed

  Calculated plant capacity (based on spacing): {capacity} plants
  Target plants (regional density):             {target} plants
  Required seeds ({rate}% germination):              {seeds} seeds
  {packets_label} ({per_packet} seeds/packet):        {packets} packets

  Gap plants (germination loss + {mortality} mortality): {gap_plants} plants
  Gap-filling seeds:                            {gap_seeds} seeds
  Gap-filling packets:                          {gap_packets} packets
{warning}",
            profile = self.profile,
            acres = request.land_area_acres,
            region = request.region,
            row = request.row_spacing,
            plant = request.plant_spacing,
            unit = request.spacing_unit,
            seed_type = request.seed_type,
            capacity = group_thousands(result.capacity_plants.trunc() as u64),
            target = group_thousands(result.target_plants.trunc() as u64),
            rate = percent(request.germination_rate),
            seeds = group_thousands(result.required_seeds),
            per_packet = group_thousands(self.seeds_per_packet),
            packets = group_thousands(result.required_packets),
            mortality = group_thousands(request.mortality_count),
            gap_plants = group_thousands(result.gap_plants.ceil() as u64),
            gap_seeds = group_thousands(result.gap_seeds),
            gap_packets = group_thousands(result.gap_packets),
        )
    }
}

fn percent(rate: f64) -> String {
    let value = rate * 100.0;
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
