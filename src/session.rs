//! Simulation session: owns the stops and cost matrix, applies operator
//! actions and plans the global, priority and per-zone routes.
//!
//! Every public method takes the session lock once for its whole
//! read-modify-write cycle, so a matrix update and a registry mutation are
//! never observed half done.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::cluster::cluster;
use crate::config::{ConfigError, PlannerConfig};
use crate::error::{PlannerError, Result};
use crate::factory::StopFactory;
use crate::matrix::CostMatrix;
use crate::registry::{Role, Stop, StopAction, StopId, StopKind, StopRegistry, ZoneId};
use crate::route::{route_geometry, PlannedRoute, RouteMetrics, RouteScope};
use crate::solver::{optimize, RouteAnchors, SolveOptions};
use crate::traits::{BoundingBox, LatLng, Metric, RoadBackend, Vertex};

/// A stop as presented to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopView {
    #[serde(flatten)]
    pub stop: Stop,
    pub kind: StopKind,
}

/// Snapshot of the session after a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationView {
    pub stops: Vec<StopView>,
    pub global: Option<PlannedRoute>,
    pub priority: Option<PlannedRoute>,
    pub zones: Vec<PlannedRoute>,
}

#[derive(Debug)]
struct SessionState {
    registry: StopRegistry,
    /// Travel times; one row per stop ever added.
    matrix: CostMatrix,
}

impl SessionState {
    fn new(config: &PlannerConfig) -> Self {
        Self {
            registry: StopRegistry::new(),
            matrix: CostMatrix::empty(Metric::Time, config.infeasible_penalty),
        }
    }
}

pub struct Session<B> {
    backend: B,
    config: PlannerConfig,
    state: Mutex<SessionState>,
}

impl<B: RoadBackend> Session<B> {
    pub fn new(backend: B, config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        let state = Mutex::new(SessionState::new(&config));
        Ok(Self {
            backend,
            config,
            state,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.backend.is_ready() {
            Ok(())
        } else {
            Err(PlannerError::NotReady)
        }
    }

    fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            two_opt_iterations: self.config.two_opt_iterations,
        }
    }

    /// Replaces all stops with freshly generated ones around a named area.
    ///
    /// Unknown areas fall back to the configured default. Points with no
    /// nearby network are dropped; any other snapping error aborts with the
    /// current stops untouched. The first stop becomes the start and the last
    /// the end. Returns the number of stops created.
    pub fn generate(&self, area: Option<&str>, seed: Option<u64>) -> Result<usize> {
        self.ensure_ready()?;
        let generation = &self.config.generation;
        let Some(center) = generation.area_center(area) else {
            return Err(ConfigError::Invalid("no generation area configured".to_string()).into());
        };
        let region = BoundingBox::around(center, generation.offset_degrees);
        let mut factory = match seed {
            Some(seed) => StopFactory::seeded(seed),
            None => StopFactory::from_entropy(),
        };
        let drafts = factory.generate(generation.count, &region, generation.priority_ratio);

        let mut snapped = Vec::with_capacity(drafts.len());
        for draft in drafts {
            match self.backend.snap(draft.location) {
                Ok(vertex) => snapped.push((vertex, draft.role)),
                Err(err @ PlannerError::NoNearbyNetwork { .. }) => {
                    warn!(%err, "generated stop dropped")
                }
                Err(err) => return Err(err),
            }
        }

        let mut state = self.state.lock();
        state.registry.clear();
        for (vertex, role) in &snapped {
            state.registry.insert(*vertex, *role);
        }
        let vertices: Vec<Vertex> = snapped.iter().map(|(vertex, _)| *vertex).collect();
        state.matrix = CostMatrix::build(
            &self.backend,
            &vertices,
            Metric::Time,
            self.config.infeasible_penalty,
        );

        let first = state.registry.stops().first().map(|stop| stop.id);
        let last = state.registry.stops().last().map(|stop| stop.id);
        if let (Some(first), Some(last)) = (first, last) {
            state.registry.fix_start(first);
            state.registry.fix_end(last);
        }

        info!(
            area = area.unwrap_or(generation.default_area.as_str()),
            stops = vertices.len(),
            "stops generated"
        );
        Ok(vertices.len())
    }

    /// Snaps `location` and appends a pending normal stop, extending the
    /// matrix by one row and column.
    pub fn add_stop(&self, location: LatLng) -> Result<StopId> {
        self.ensure_ready()?;
        let vertex = self.backend.snap(location)?;

        let mut state = self.state.lock();
        let existing = state.registry.vertices();
        state.matrix.append_one(&self.backend, &existing, &vertex);
        let id = state.registry.insert(vertex, Role::Normal);
        debug_assert_eq!(state.matrix.dim(), state.registry.len());

        info!(stop = %id, lat = vertex.location.lat, lng = vertex.location.lng, "stop added");
        Ok(id)
    }

    /// Applies a lifecycle or designation action. Unknown ids are no-ops.
    pub fn apply(&self, id: StopId, action: StopAction) -> bool {
        self.state.lock().registry.apply(id, action)
    }

    /// Clears the start and end designations.
    pub fn clear_route(&self) {
        self.state.lock().registry.clear_anchors();
    }

    /// Discards every stop and the matrix.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = SessionState::new(&self.config);
        info!("session reset");
    }

    pub fn assign_zone_in_bounds(&self, bounds: &BoundingBox, zone: ZoneId) -> usize {
        self.state.lock().registry.assign_zone_in_bounds(bounds, zone)
    }

    pub fn clear_zones(&self, zone: Option<ZoneId>) -> usize {
        self.state.lock().registry.clear_zones(zone)
    }

    /// Replaces zone tags with clusters of the pending stops, computed on the
    /// grouping metric. Returns the number of zones.
    pub fn auto_zone(&self) -> Result<usize> {
        self.ensure_ready()?;
        let mut state = self.state.lock();

        let pending = state.registry.pending();
        let vertices: Vec<Vertex> = pending
            .iter()
            .filter_map(|id| state.registry.get(*id).map(Stop::network_vertex))
            .collect();
        let grouping = CostMatrix::build(
            &self.backend,
            &vertices,
            Metric::Grouping,
            self.config.infeasible_penalty,
        );
        let local: Vec<usize> = (0..vertices.len()).collect();
        let groups = cluster(&local, &grouping, self.config.cluster_threshold);

        state.registry.clear_zones(None);
        for (zone, members) in groups.iter().enumerate() {
            for &member in members {
                state.registry.assign_zone(pending[member], Some(zone as ZoneId));
            }
        }

        info!(stops = pending.len(), zones = groups.len(), "automatic zoning");
        Ok(groups.len())
    }

    /// Measures a caller-given order without optimizing it. Unknown and
    /// deleted stops are left out.
    pub fn sequence_route(&self, ids: &[StopId]) -> Result<PlannedRoute> {
        self.ensure_ready()?;
        let state = self.state.lock();
        let stops: Vec<&Stop> = ids
            .iter()
            .filter_map(|id| state.registry.get(*id))
            .filter(|stop| !stop.is_deleted())
            .collect();
        Ok(self.planned(RouteScope::Sequence, &stops))
    }

    /// Current stops plus the global, priority and zone routes.
    pub fn view(&self) -> Result<SimulationView> {
        self.ensure_ready()?;
        let state = self.state.lock();
        let registry = &state.registry;

        let stops = registry
            .visible()
            .map(|stop| StopView {
                stop: stop.clone(),
                kind: registry.kind_of(stop),
            })
            .collect();

        let start = registry.start_index();
        let end = registry.end_index();

        let global = start.and_then(|_| {
            self.plan(
                &state,
                RouteScope::Global,
                &registry.global_active(),
                RouteAnchors::new(start, end),
            )
        });
        let priority = self.plan(
            &state,
            RouteScope::Priority,
            &registry.priority_active(),
            RouteAnchors::new(start, None),
        );
        let zones = registry
            .zones()
            .into_iter()
            .filter_map(|zone| {
                self.plan(
                    &state,
                    RouteScope::Zone(zone),
                    &registry.zone_active(zone),
                    RouteAnchors::new(start, None),
                )
            })
            .collect();

        Ok(SimulationView {
            stops,
            global,
            priority,
            zones,
        })
    }

    /// Stops in matrix-index order, deleted ones included.
    pub fn stops(&self) -> Vec<Stop> {
        self.state.lock().registry.stops().to_vec()
    }

    pub fn stop(&self, id: StopId) -> Option<Stop> {
        self.state.lock().registry.get(id).cloned()
    }

    pub fn anchors(&self) -> (Option<StopId>, Option<StopId>) {
        let state = self.state.lock();
        (state.registry.start(), state.registry.end())
    }

    pub fn priority_selection(&self) -> Vec<StopId> {
        let state = self.state.lock();
        ids_at(&state.registry, &state.registry.priority_active())
    }

    pub fn global_selection(&self) -> Vec<StopId> {
        let state = self.state.lock();
        ids_at(&state.registry, &state.registry.global_active())
    }

    pub fn matrix_dim(&self) -> usize {
        self.state.lock().matrix.dim()
    }

    /// Optimizes `active`; selections of fewer than two stops yield no route.
    fn plan(
        &self,
        state: &SessionState,
        scope: RouteScope,
        active: &[usize],
        anchors: RouteAnchors,
    ) -> Option<PlannedRoute> {
        if active.len() < 2 {
            return None;
        }
        let positions = state.registry.positions();
        let order = optimize(active, &state.matrix, anchors, &positions, &self.solve_options());
        let stops: Vec<&Stop> = order
            .iter()
            .filter_map(|&index| state.registry.at_index(index))
            .collect();
        Some(self.planned(scope, &stops))
    }

    fn planned(&self, scope: RouteScope, stops: &[&Stop]) -> PlannedRoute {
        let vertices: Vec<Vertex> = stops.iter().map(|stop| stop.network_vertex()).collect();
        let service_secs = self.config.service_time_minutes * 60.0;
        PlannedRoute {
            scope,
            stops: stops.iter().map(|stop| stop.id).collect(),
            metrics: RouteMetrics::measure(&self.backend, &vertices, service_secs),
            geometry: route_geometry(&self.backend, &vertices),
        }
    }
}

fn ids_at(registry: &StopRegistry, indices: &[usize]) -> Vec<StopId> {
    indices
        .iter()
        .filter_map(|&index| registry.at_index(index).map(|stop| stop.id))
        .collect()
}
