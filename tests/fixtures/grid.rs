//! Planar test backend.
//!
//! Treats longitude as x and latitude as y, with Euclidean travel costs in
//! seconds and metres alike. Points with `lat >= WALL` sit behind a wall and
//! are unreachable from points in front of it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use stop_planner::PlannerError;
use stop_planner::polyline::Polyline;
use stop_planner::traits::{CostOracle, LatLng, Metric, NetworkSnapper, PathCost, Vertex, VertexRef};

pub const WALL: f64 = 100.0;

/// Beyond this distance from the origin there is no network.
pub const NETWORK_EDGE: f64 = 1000.0;

#[derive(Debug)]
pub struct GridBackend {
    ready: AtomicBool,
    snapping: AtomicBool,
    queries: AtomicUsize,
}

impl Default for GridBackend {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(true),
            snapping: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }
}

impl GridBackend {
    pub fn offline() -> Self {
        let backend = Self::default();
        backend.ready.store(false, Ordering::SeqCst);
        backend
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Keeps answering readiness checks but fails every snap with
    /// `NotReady`, as an upstream that drops mid-request does.
    pub fn set_snapping(&self, snapping: bool) {
        self.snapping.store(snapping, Ordering::SeqCst);
    }

    /// Cost queries answered so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn vertex(x: f64, y: f64) -> Vertex {
        GridBackend::default().snap(LatLng::new(y, x)).unwrap()
    }
}

impl NetworkSnapper for GridBackend {
    fn snap(&self, location: LatLng) -> Result<Vertex, PlannerError> {
        if !(self.ready.load(Ordering::SeqCst) && self.snapping.load(Ordering::SeqCst)) {
            return Err(PlannerError::NotReady);
        }
        if !(location.lat.abs() <= NETWORK_EDGE && location.lng.abs() <= NETWORK_EDGE) {
            return Err(PlannerError::NoNearbyNetwork {
                lat: location.lat,
                lng: location.lng,
            });
        }
        Ok(Vertex {
            id: VertexRef(location.lat.to_bits() ^ location.lng.to_bits().rotate_left(32)),
            location,
        })
    }
}

impl CostOracle for GridBackend {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn path_cost(&self, from: &Vertex, to: &Vertex, _metric: Metric) -> PathCost {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if (from.location.lat >= WALL) != (to.location.lat >= WALL) {
            return PathCost::Infeasible;
        }
        let dx = from.location.lng - to.location.lng;
        let dy = from.location.lat - to.location.lat;
        PathCost::Cost((dx * dx + dy * dy).sqrt())
    }

    fn path_geometry(&self, from: &Vertex, to: &Vertex) -> Option<Polyline> {
        if (from.location.lat >= WALL) != (to.location.lat >= WALL) {
            return None;
        }
        Some(Polyline::new(vec![from.location, to.location]))
    }
}
