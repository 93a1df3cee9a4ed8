//! Stop registry: the authoritative stop list and its lifecycle state machine.
//!
//! ```text
//! PENDING ──visit──▶ VISITED
//! PENDING ◀─restore── SKIPPED ◀──skip── PENDING
//! SKIPPED ──visit──▶ VISITED
//! any ──delete──▶ DELETED (terminal, soft)
//! ```
//!
//! Stops are never removed. A stop's matrix index equals its insertion
//! position, so the shared cost matrix never needs compaction.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::{BoundingBox, LatLng, Vertex, VertexRef};

/// Stable stop identifier, displayed as `P-{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub u32);

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl std::str::FromStr for StopId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("P-").unwrap_or(s).parse().map(StopId)
    }
}

pub type ZoneId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Normal,
    Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    Pending,
    Visited,
    Skipped,
    Deleted,
}

/// How a stop should be presented. Start wins over end, end over role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopKind {
    Start,
    End,
    Priority,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    /// Snapped coordinate of the stop's network vertex.
    pub location: LatLng,
    pub vertex: VertexRef,
    pub role: Role,
    pub state: Lifecycle,
    pub zone: Option<ZoneId>,
    pub matrix_index: usize,
}

impl Stop {
    pub fn network_vertex(&self) -> Vertex {
        Vertex {
            id: self.vertex,
            location: self.location,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.state == Lifecycle::Deleted
    }

    pub fn is_pending(&self) -> bool {
        self.state == Lifecycle::Pending
    }
}

/// A lifecycle or designation change requested for one stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopAction {
    /// Mark visited; with `advance_start` the stop also becomes the start.
    Visit { advance_start: bool },
    Skip,
    Restore,
    Delete,
    AssignZone(Option<ZoneId>),
    ToggleRole,
    FixStart,
    FixEnd,
}

#[derive(Debug, Clone, Default)]
pub struct StopRegistry {
    stops: Vec<Stop>,
    next_id: u32,
    start: Option<StopId>,
    end: Option<StopId>,
}

impl StopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending stop. Its matrix index is the current stop count.
    pub fn insert(&mut self, vertex: Vertex, role: Role) -> StopId {
        self.next_id += 1;
        let id = StopId(self.next_id);
        self.stops.push(Stop {
            id,
            location: vertex.location,
            vertex: vertex.id,
            role,
            state: Lifecycle::Pending,
            zone: None,
            matrix_index: self.stops.len(),
        });
        id
    }

    /// Drops every stop and designation. Ids keep counting upward.
    pub fn clear(&mut self) {
        self.stops.clear();
        self.start = None;
        self.end = None;
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Non-deleted stops, in creation order.
    pub fn visible(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(|stop| !stop.is_deleted())
    }

    pub fn get(&self, id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id == id)
    }

    fn get_mut(&mut self, id: StopId) -> Option<&mut Stop> {
        self.stops.iter_mut().find(|stop| stop.id == id)
    }

    /// Vertices in matrix-index order, deleted stops included.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.stops.iter().map(Stop::network_vertex).collect()
    }

    /// Coordinates in matrix-index order.
    pub fn positions(&self) -> Vec<LatLng> {
        self.stops.iter().map(|stop| stop.location).collect()
    }

    pub fn start(&self) -> Option<StopId> {
        self.start
    }

    pub fn end(&self) -> Option<StopId> {
        self.end
    }

    /// Applies `action` to `id`. Returns whether anything changed; unknown ids
    /// and disallowed transitions are silent no-ops.
    pub fn apply(&mut self, id: StopId, action: StopAction) -> bool {
        let changed = match action {
            StopAction::Visit { advance_start } => self.visit(id, advance_start),
            StopAction::Skip => self.skip(id),
            StopAction::Restore => self.restore(id),
            StopAction::Delete => self.delete(id),
            StopAction::AssignZone(zone) => self.assign_zone(id, zone),
            StopAction::ToggleRole => self.toggle_role(id),
            StopAction::FixStart => self.fix_start(id),
            StopAction::FixEnd => self.fix_end(id),
        };
        debug!(stop = %id, ?action, changed, "stop action");
        changed
    }

    /// PENDING | SKIPPED -> VISITED.
    pub fn visit(&mut self, id: StopId, advance_start: bool) -> bool {
        let Some(stop) = self.get_mut(id) else {
            return false;
        };
        if !matches!(stop.state, Lifecycle::Pending | Lifecycle::Skipped) {
            return false;
        }
        stop.state = Lifecycle::Visited;
        if advance_start {
            self.start = Some(id);
        }
        true
    }

    /// PENDING -> SKIPPED.
    pub fn skip(&mut self, id: StopId) -> bool {
        self.transition(id, Lifecycle::Skipped, Lifecycle::Pending)
    }

    /// SKIPPED -> PENDING. A visited stop stays visited.
    pub fn restore(&mut self, id: StopId) -> bool {
        self.transition(id, Lifecycle::Pending, Lifecycle::Skipped)
    }

    fn transition(&mut self, id: StopId, to: Lifecycle, from: Lifecycle) -> bool {
        match self.get_mut(id) {
            Some(stop) if stop.state == from => {
                stop.state = to;
                true
            }
            _ => false,
        }
    }

    /// Any -> DELETED. Clears a start or end designation held by the stop.
    pub fn delete(&mut self, id: StopId) -> bool {
        let Some(stop) = self.get_mut(id) else {
            return false;
        };
        if stop.is_deleted() {
            return false;
        }
        stop.state = Lifecycle::Deleted;
        if self.start == Some(id) {
            self.start = None;
        }
        if self.end == Some(id) {
            self.end = None;
        }
        true
    }

    /// Sets or clears the zone tag in any state. Inert on deleted stops.
    pub fn assign_zone(&mut self, id: StopId, zone: Option<ZoneId>) -> bool {
        match self.get_mut(id) {
            Some(stop) => {
                stop.zone = zone;
                true
            }
            None => false,
        }
    }

    pub fn toggle_role(&mut self, id: StopId) -> bool {
        match self.get_mut(id) {
            Some(stop) if !stop.is_deleted() => {
                stop.role = match stop.role {
                    Role::Normal => Role::Priority,
                    Role::Priority => Role::Normal,
                };
                true
            }
            _ => false,
        }
    }

    /// Designates the start regardless of lifecycle state.
    pub fn fix_start(&mut self, id: StopId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.start = Some(id);
        true
    }

    /// Designates the end regardless of lifecycle state.
    pub fn fix_end(&mut self, id: StopId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.end = Some(id);
        true
    }

    pub fn clear_anchors(&mut self) {
        self.start = None;
        self.end = None;
    }

    /// Tags every non-deleted stop inside `bounds` with `zone`.
    pub fn assign_zone_in_bounds(&mut self, bounds: &BoundingBox, zone: ZoneId) -> usize {
        let mut tagged = 0;
        for stop in self.stops.iter_mut() {
            if !stop.is_deleted() && bounds.contains(stop.location) {
                stop.zone = Some(zone);
                tagged += 1;
            }
        }
        tagged
    }

    /// Removes one zone tag, or every tag when `zone` is `None`.
    pub fn clear_zones(&mut self, zone: Option<ZoneId>) -> usize {
        let mut cleared = 0;
        for stop in self.stops.iter_mut() {
            let matches = match zone {
                Some(zone) => stop.zone == Some(zone),
                None => stop.zone.is_some(),
            };
            if matches {
                stop.zone = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Zone tags carried by non-deleted stops.
    pub fn zones(&self) -> BTreeSet<ZoneId> {
        self.visible().filter_map(|stop| stop.zone).collect()
    }

    pub fn kind_of(&self, stop: &Stop) -> StopKind {
        if self.start == Some(stop.id) {
            StopKind::Start
        } else if self.end == Some(stop.id) {
            StopKind::End
        } else if stop.role == Role::Priority {
            StopKind::Priority
        } else {
            StopKind::Normal
        }
    }

    fn live(&self, id: Option<StopId>) -> Option<&Stop> {
        id.and_then(|id| self.get(id)).filter(|stop| !stop.is_deleted())
    }

    /// Matrix index of the start, unless it has been deleted.
    pub fn start_index(&self) -> Option<usize> {
        self.live(self.start).map(|stop| stop.matrix_index)
    }

    /// Matrix index of the end, unless it has been deleted.
    pub fn end_index(&self) -> Option<usize> {
        self.live(self.end).map(|stop| stop.matrix_index)
    }

    /// Pending stops plus the start and end, whatever their state.
    pub fn global_active(&self) -> Vec<usize> {
        self.visible()
            .filter(|stop| {
                stop.is_pending() || Some(stop.id) == self.start || Some(stop.id) == self.end
            })
            .map(|stop| stop.matrix_index)
            .collect()
    }

    /// Pending priority stops, with the start prepended when set.
    pub fn priority_active(&self) -> Vec<usize> {
        let selected = self
            .visible()
            .filter(|stop| stop.is_pending() && stop.role == Role::Priority)
            .map(|stop| stop.matrix_index)
            .collect();
        self.with_start(selected, |_| true)
    }

    /// Pending stops of `zone`, with the start prepended when it is in `zone`.
    pub fn zone_active(&self, zone: ZoneId) -> Vec<usize> {
        let selected = self
            .visible()
            .filter(|stop| stop.is_pending() && stop.zone == Some(zone))
            .map(|stop| stop.matrix_index)
            .collect();
        self.with_start(selected, |start| start.zone == Some(zone))
    }

    /// Pending stops, for automatic zoning.
    pub fn pending(&self) -> Vec<StopId> {
        self.visible()
            .filter(|stop| stop.is_pending())
            .map(|stop| stop.id)
            .collect()
    }

    fn with_start(&self, mut selected: Vec<usize>, eligible: impl Fn(&Stop) -> bool) -> Vec<usize> {
        if let Some(start) = self.live(self.start).filter(|stop| eligible(stop)) {
            if !selected.contains(&start.matrix_index) {
                selected.insert(0, start.matrix_index);
            }
        }
        selected
    }

    /// Stop at a matrix index.
    pub fn at_index(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }
}
