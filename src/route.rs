//! Route metrics and geometry, measured leg by leg through the oracle.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::polyline::Polyline;
use crate::registry::{StopId, ZoneId};
use crate::traits::{CostOracle, Metric, PathCost, Vertex};

/// Distance and duration of a visiting order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMetrics {
    /// Kilometres, rounded to two decimals.
    pub distance_km: f64,
    /// Travel plus service time, in seconds.
    pub duration_secs: f64,
}

impl RouteMetrics {
    /// Walks consecutive pairs of `vertices`.
    ///
    /// Every leg adds travel time, distance and one service period; the final
    /// stop adds one more service period. Unreachable legs add nothing. Fewer
    /// than two vertices measure as zero.
    pub fn measure<O>(oracle: &O, vertices: &[Vertex], service_secs: f64) -> Self
    where
        O: CostOracle + ?Sized,
    {
        if vertices.len() < 2 {
            return Self::default();
        }

        let mut metres = 0.0;
        let mut seconds = 0.0;
        for leg in vertices.windows(2) {
            let time = oracle.path_cost(&leg[0], &leg[1], Metric::Time);
            let distance = oracle.path_cost(&leg[0], &leg[1], Metric::Distance);
            match (time, distance) {
                (PathCost::Cost(time), PathCost::Cost(distance)) => {
                    metres += distance;
                    seconds += time + service_secs;
                }
                _ => warn!(
                    from = leg[0].id.0,
                    to = leg[1].id.0,
                    "unreachable leg left out of route metrics"
                ),
            }
        }
        seconds += service_secs;

        Self {
            distance_km: (metres / 1000.0 * 100.0).round() / 100.0,
            duration_secs: seconds,
        }
    }

    /// `"{m}m"` below an hour, `"{h}h {m}m"` otherwise.
    pub fn duration_label(&self) -> String {
        let minutes = (self.duration_secs / 60.0).floor() as u64;
        if minutes < 60 {
            format!("{}m", minutes)
        } else {
            format!("{}h {}m", minutes / 60, minutes % 60)
        }
    }
}

/// Concatenated leg geometries. Unreachable legs are skipped.
pub fn route_geometry<O>(oracle: &O, vertices: &[Vertex]) -> Polyline
where
    O: CostOracle + ?Sized,
{
    vertices
        .windows(2)
        .filter_map(|leg| oracle.path_geometry(&leg[0], &leg[1]))
        .collect()
}

/// Which selection a planned route was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteScope {
    Global,
    Priority,
    Zone(ZoneId),
    Sequence,
}

/// A visiting order with its metrics and rendering geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRoute {
    pub scope: RouteScope,
    pub stops: Vec<StopId>,
    pub metrics: RouteMetrics,
    pub geometry: Polyline,
}
