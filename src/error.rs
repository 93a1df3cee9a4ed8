//! Error types for the planner.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced to callers of the planner.
///
/// Unknown stop ids make actions no-ops and infeasible paths become penalty
/// costs, so neither appears here.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The road network is not loaded yet. Callers may retry.
    #[error("road network not ready")]
    NotReady,

    /// A coordinate could not be mapped to the road network.
    #[error("no road network near ({lat:.6}, {lng:.6})")]
    NoNearbyNetwork { lat: f64, lng: f64 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PlannerError {
    /// Whether the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlannerError::NotReady)
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
