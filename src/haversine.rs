//! Straight-line oracle for running without a road network.
//!
//! Every coordinate is its own vertex and every pair is reachable. Travel
//! time assumes a constant speed over the great-circle distance.

use crate::error::PlannerError;
use crate::polyline::Polyline;
use crate::traits::{CostOracle, LatLng, Metric, NetworkSnapper, PathCost, Vertex, VertexRef};

const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineOracle {
    pub speed_kmh: f64,
}

impl Default for HaversineOracle {
    fn default() -> Self {
        Self::new(40.0)
    }
}

impl HaversineOracle {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance in kilometres.
    pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
        let (phi1, phi2) = (from.lat.to_radians(), to.lat.to_radians());
        let half_dphi = (phi2 - phi1) / 2.0;
        let half_dlambda = (to.lng - from.lng).to_radians() / 2.0;

        let h = half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2);
        2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
    }

    fn travel_secs(&self, km: f64) -> f64 {
        km * 3600.0 / self.speed_kmh
    }
}

/// Packs micro-degree latitude and longitude into one id.
fn micro_degree_ref(location: LatLng) -> VertexRef {
    let micro = |degrees: f64| (degrees * 1e6).round() as i32 as u32 as u64;
    VertexRef((micro(location.lat) << 32) | micro(location.lng))
}

impl NetworkSnapper for HaversineOracle {
    fn snap(&self, location: LatLng) -> Result<Vertex, PlannerError> {
        if location.lat.is_finite() && location.lng.is_finite() {
            Ok(Vertex {
                id: micro_degree_ref(location),
                location,
            })
        } else {
            Err(PlannerError::NoNearbyNetwork {
                lat: location.lat,
                lng: location.lng,
            })
        }
    }
}

impl CostOracle for HaversineOracle {
    fn path_cost(&self, from: &Vertex, to: &Vertex, metric: Metric) -> PathCost {
        let km = Self::haversine_km(from.location, to.location);
        PathCost::Cost(match metric {
            Metric::Time => self.travel_secs(km),
            Metric::Distance | Metric::Grouping => km * 1000.0,
        })
    }

    fn path_geometry(&self, from: &Vertex, to: &Vertex) -> Option<Polyline> {
        Some(Polyline::new(vec![from.location, to.location]))
    }
}
