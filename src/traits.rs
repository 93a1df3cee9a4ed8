//! Collaborator interfaces for the planner core.
//!
//! The core never computes shortest paths itself. Road networks, OSRM servers
//! and straight-line estimators plug in through these traits.

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::polyline::Polyline;

/// A geographic coordinate (latitude, longitude) in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Easting used for deterministic seed selection.
    pub fn easting(&self) -> f64 {
        self.lng
    }
}

/// Opaque reference into an external road network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexRef(pub u64);

/// A snapped network vertex: its reference plus the vertex's own coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexRef,
    pub location: LatLng,
}

/// Named cost metric for path queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Travel time in seconds.
    Time,
    /// Travel distance in metres.
    Distance,
    /// Zone-grouping cost: distance with major roads penalised.
    Grouping,
}

/// Result of a single path cost query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCost {
    Cost(f64),
    /// No path exists between the two vertices.
    Infeasible,
}

impl PathCost {
    pub fn or_penalty(self, penalty: f64) -> f64 {
        match self {
            PathCost::Cost(value) => value,
            PathCost::Infeasible => penalty,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, PathCost::Infeasible)
    }
}

/// Maps a coordinate onto the road network.
pub trait NetworkSnapper {
    /// Fails with [`PlannerError::NoNearbyNetwork`] when no vertex is close
    /// enough, or [`PlannerError::NotReady`] when the network is not loaded.
    fn snap(&self, location: LatLng) -> Result<Vertex, PlannerError>;
}

/// Travel cost and geometry between two network vertices.
///
/// Must be `Sync`: full matrix builds query the oracle from several threads.
pub trait CostOracle: Send + Sync {
    /// Whether the underlying network is loaded and queryable.
    fn is_ready(&self) -> bool {
        true
    }

    fn path_cost(&self, from: &Vertex, to: &Vertex, metric: Metric) -> PathCost;

    /// Physical path for rendering. `None` when no path exists.
    fn path_geometry(&self, from: &Vertex, to: &Vertex) -> Option<Polyline>;
}

/// Anything usable as a full road network backend.
pub trait RoadBackend: CostOracle + NetworkSnapper {}

impl<T> RoadBackend for T where T: CostOracle + NetworkSnapper {}

/// An axis-aligned latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: LatLng,
    pub max: LatLng,
}

impl BoundingBox {
    /// Rectangle spanned by two opposite corners, in any order.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            min: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            max: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Square of half-width `offset` degrees around `center`.
    pub fn around(center: LatLng, offset: f64) -> Self {
        Self::from_corners(
            LatLng::new(center.lat - offset, center.lng - offset),
            LatLng::new(center.lat + offset, center.lng + offset),
        )
    }

    /// Inclusive on all edges.
    pub fn contains(&self, point: LatLng) -> bool {
        (self.min.lat..=self.max.lat).contains(&point.lat)
            && (self.min.lng..=self.max.lng).contains(&point.lng)
    }
}
