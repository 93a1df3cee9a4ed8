//! In-memory road network oracle.
//!
//! Edges carry a length and a road class. Travel time uses per-class speeds;
//! the grouping metric multiplies avenue lengths so that zones do not stretch
//! across fast roads. Shortest paths come from `petgraph`.

use std::collections::HashMap;

use petgraph::algo::{astar, kosaraju_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::haversine::HaversineOracle;
use crate::polyline::Polyline;
use crate::traits::{CostOracle, LatLng, Metric, NetworkSnapper, PathCost, Vertex, VertexRef};

/// Highway tags treated as major roads.
const AVENUE_TAGS: &[&str] = &["primary", "secondary", "trunk", "primary_link", "secondary_link"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Street,
    Avenue,
}

impl RoadClass {
    /// Classifies an OpenStreetMap `highway` tag.
    pub fn from_highway_tag(tag: &str) -> Self {
        if AVENUE_TAGS.contains(&tag) {
            RoadClass::Avenue
        } else {
            RoadClass::Street
        }
    }
}

/// Per-metric edge weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWeights {
    pub street_speed_kmh: f64,
    pub avenue_speed_kmh: f64,
    pub major_road_multiplier: f64,
}

impl Default for EdgeWeights {
    fn default() -> Self {
        Self::from(&PlannerConfig::default())
    }
}

impl From<&PlannerConfig> for EdgeWeights {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            street_speed_kmh: config.street_speed_kmh,
            avenue_speed_kmh: config.avenue_speed_kmh,
            major_road_multiplier: config.major_road_multiplier,
        }
    }
}

impl EdgeWeights {
    pub fn weight(&self, edge: &RoadEdge, metric: Metric) -> f64 {
        match (metric, edge.class) {
            (Metric::Distance, _) => edge.length_m,
            (Metric::Time, RoadClass::Street) => edge.length_m / (self.street_speed_kmh / 3.6),
            (Metric::Time, RoadClass::Avenue) => edge.length_m / (self.avenue_speed_kmh / 3.6),
            (Metric::Grouping, RoadClass::Street) => edge.length_m,
            (Metric::Grouping, RoadClass::Avenue) => edge.length_m * self.major_road_multiplier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadEdge {
    pub length_m: f64,
    pub class: RoadClass,
}

#[derive(Debug, Clone, Default)]
pub struct RoadNetworkBuilder {
    nodes: Vec<(VertexRef, LatLng)>,
    roads: Vec<(VertexRef, VertexRef, RoadEdge)>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: u64, location: LatLng) -> Self {
        self.nodes.push((VertexRef(id), location));
        self
    }

    /// Adds a one-way road segment.
    pub fn one_way(mut self, from: u64, to: u64, length_m: f64, class: RoadClass) -> Self {
        self.roads
            .push((VertexRef(from), VertexRef(to), RoadEdge { length_m, class }));
        self
    }

    /// Adds a segment drivable in both directions.
    pub fn two_way(self, a: u64, b: u64, length_m: f64, class: RoadClass) -> Self {
        self.one_way(a, b, length_m, class).one_way(b, a, length_m, class)
    }

    /// Builds the network, keeping only its largest strongly connected
    /// component. Roads naming unknown nodes are dropped.
    pub fn build(self, weights: EdgeWeights) -> RoadNetwork {
        let mut graph: DiGraph<(VertexRef, LatLng), RoadEdge> = DiGraph::new();
        let mut index = HashMap::new();
        for (id, location) in self.nodes {
            index.entry(id).or_insert_with(|| graph.add_node((id, location)));
        }
        let mut dropped = 0;
        for (from, to, edge) in self.roads {
            match (index.get(&from), index.get(&to)) {
                (Some(&a), Some(&b)) => {
                    graph.add_edge(a, b, edge);
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "roads referencing unknown nodes dropped");
        }

        let largest = kosaraju_scc(&graph)
            .into_iter()
            .max_by_key(|component| component.len())
            .unwrap_or_default();
        let keep: std::collections::HashSet<NodeIndex> = largest.into_iter().collect();
        let total = graph.node_count();
        graph.retain_nodes(|_, node| keep.contains(&node));

        let by_ref = graph
            .node_indices()
            .map(|node| (graph[node].0, node))
            .collect();
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            discarded = total - graph.node_count(),
            "road network ready"
        );

        RoadNetwork {
            graph,
            by_ref,
            weights,
            max_snap_distance_m: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoadNetwork {
    graph: DiGraph<(VertexRef, LatLng), RoadEdge>,
    by_ref: HashMap<VertexRef, NodeIndex>,
    weights: EdgeWeights,
    max_snap_distance_m: Option<f64>,
}

impl RoadNetwork {
    /// Rejects snaps farther than `metres` from the nearest vertex.
    pub fn with_max_snap_distance(mut self, metres: f64) -> Self {
        self.max_snap_distance_m = Some(metres);
        self
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn shortest(&self, from: &Vertex, to: &Vertex, metric: Metric) -> Option<(f64, Vec<NodeIndex>)> {
        let start = *self.by_ref.get(&from.id)?;
        let goal = *self.by_ref.get(&to.id)?;
        astar(
            &self.graph,
            start,
            |node| node == goal,
            |edge| self.weights.weight(edge.weight(), metric),
            |_| 0.0,
        )
    }
}

impl NetworkSnapper for RoadNetwork {
    fn snap(&self, location: LatLng) -> Result<Vertex, PlannerError> {
        if !self.is_ready() {
            return Err(PlannerError::NotReady);
        }
        let nearest = self
            .graph
            .node_weights()
            .map(|&(id, at)| (HaversineOracle::haversine_km(location, at) * 1000.0, id, at))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((metres, id, at)) if self.max_snap_distance_m.is_none_or(|max| metres <= max) => {
                Ok(Vertex { id, location: at })
            }
            _ => Err(PlannerError::NoNearbyNetwork {
                lat: location.lat,
                lng: location.lng,
            }),
        }
    }
}

impl CostOracle for RoadNetwork {
    fn is_ready(&self) -> bool {
        self.graph.node_count() > 0
    }

    fn path_cost(&self, from: &Vertex, to: &Vertex, metric: Metric) -> PathCost {
        match self.shortest(from, to, metric) {
            Some((cost, _)) => PathCost::Cost(cost),
            None => PathCost::Infeasible,
        }
    }

    fn path_geometry(&self, from: &Vertex, to: &Vertex) -> Option<Polyline> {
        let (_, path) = self.shortest(from, to, Metric::Time)?;
        Some(Polyline::new(path.into_iter().map(|node| self.graph[node].1).collect()))
    }
}
