//! Planner configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```
//! use stop_planner::config::PlannerConfig;
//!
//! let config = PlannerConfig::from_toml_str(r#"
//!     two_opt_iterations = 30
//!     cluster_threshold = 750.0
//!
//!     [generation]
//!     count = 10
//!     default_area = "ipn"
//! "#).unwrap();
//!
//! assert_eq!(config.two_opt_iterations, 30);
//! assert_eq!(config.generation.count, 10);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::LatLng;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Finite cost standing in for an unreachable pair.
    pub infeasible_penalty: f64,
    /// Cap on 2-opt improvement sweeps.
    pub two_opt_iterations: usize,
    /// Maximum complete-linkage cost for two groups to merge.
    pub cluster_threshold: f64,
    /// Grouping-cost multiplier applied to major road edges.
    pub major_road_multiplier: f64,
    pub street_speed_kmh: f64,
    pub avenue_speed_kmh: f64,
    /// Dwell time charged per stop when measuring a route.
    pub service_time_minutes: f64,
    pub generation: GenerationConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            infeasible_penalty: 9e9,
            two_opt_iterations: 50,
            cluster_threshold: 1000.0,
            major_road_multiplier: 10.0,
            street_speed_kmh: 20.0,
            avenue_speed_kmh: 50.0,
            service_time_minutes: 5.0,
            generation: GenerationConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.infeasible_penalty.is_finite() && self.infeasible_penalty > 0.0) {
            return Err(ConfigError::Invalid(
                "infeasible_penalty must be finite and positive".to_string(),
            ));
        }
        if !(1..=1000).contains(&self.two_opt_iterations) {
            return Err(ConfigError::Invalid(format!(
                "two_opt_iterations must be in 1..=1000, got {}",
                self.two_opt_iterations
            )));
        }
        if !(self.cluster_threshold.is_finite() && self.cluster_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "cluster_threshold must be finite and positive".to_string(),
            ));
        }
        if !(self.major_road_multiplier.is_finite() && self.major_road_multiplier >= 1.0) {
            return Err(ConfigError::Invalid(
                "major_road_multiplier must be finite and at least 1".to_string(),
            ));
        }
        for speed in [self.street_speed_kmh, self.avenue_speed_kmh] {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::Invalid(
                    "speeds must be finite and positive".to_string(),
                ));
            }
        }
        if !(self.service_time_minutes.is_finite() && self.service_time_minutes >= 0.0) {
            return Err(ConfigError::Invalid(
                "service_time_minutes must be finite and not negative".to_string(),
            ));
        }
        self.generation.validate()
    }
}

/// Random stop generation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub count: usize,
    /// Half-width of the sampling box around an area centre, in degrees.
    pub offset_degrees: f64,
    /// Probability that a generated stop is a priority stop.
    pub priority_ratio: f64,
    pub default_area: String,
    pub areas: BTreeMap<String, LatLng>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let mut areas = BTreeMap::new();
        areas.insert("neza".to_string(), LatLng::new(19.4938, -99.0478));
        areas.insert("ipn".to_string(), LatLng::new(19.491472, -99.140639));
        Self {
            count: 32,
            offset_degrees: 0.015,
            priority_ratio: 0.20,
            default_area: "neza".to_string(),
            areas,
        }
    }
}

impl GenerationConfig {
    /// Centre for a named area, falling back to the default area.
    pub fn area_center(&self, name: Option<&str>) -> Option<LatLng> {
        name.and_then(|name| self.areas.get(name))
            .or_else(|| self.areas.get(&self.default_area))
            .copied()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.priority_ratio) {
            return Err(ConfigError::Invalid(
                "generation.priority_ratio must be in [0, 1]".to_string(),
            ));
        }
        if !(self.offset_degrees.is_finite() && self.offset_degrees >= 0.0) {
            return Err(ConfigError::Invalid(
                "generation.offset_degrees must be finite and not negative".to_string(),
            ));
        }
        if let Some((name, _)) = self
            .areas
            .iter()
            .find(|(_, center)| !(center.lat.is_finite() && center.lng.is_finite()))
        {
            return Err(ConfigError::Invalid(format!(
                "generation.areas.{} has a non-finite centre",
                name
            )));
        }
        if !self.areas.contains_key(&self.default_area) {
            return Err(ConfigError::Invalid(format!(
                "generation.default_area '{}' is not a configured area",
                self.default_area
            )));
        }
        Ok(())
    }
}
