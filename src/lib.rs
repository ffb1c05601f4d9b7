pub mod config;
pub mod estimator;
pub mod logging;
pub mod report;
pub mod units;
pub mod web;

pub use config::{Profile, ProfileLoader};
pub use estimator::{calculate, CalculationRequest, CalculationResult, EstimateError, RoundingPolicy};
pub use units::SpacingUnit;
