//! Session tests
//!
//! Lifecycle actions, selections and planned routes through the full
//! session, using the planar grid backend.

mod fixtures;

use std::collections::HashSet;

use stop_planner::config::PlannerConfig;
use stop_planner::registry::{Lifecycle, Role, StopAction, StopId, StopKind};
use stop_planner::route::RouteScope;
use stop_planner::traits::{BoundingBox, LatLng};
use stop_planner::{PlannerError, Session};

use fixtures::GridBackend;

// ============================================================================
// Helpers
// ============================================================================

fn config() -> PlannerConfig {
    PlannerConfig {
        service_time_minutes: 0.0,
        ..PlannerConfig::default()
    }
}

fn session_with(points: &[(f64, f64)]) -> (Session<GridBackend>, Vec<StopId>) {
    let session = Session::new(GridBackend::default(), config()).unwrap();
    let ids = points
        .iter()
        .map(|&(x, y)| session.add_stop(LatLng::new(y, x)).unwrap())
        .collect();
    (session, ids)
}

fn grid_generation_config(count: usize) -> PlannerConfig {
    let mut config = config();
    config.generation.count = count;
    config.generation.offset_degrees = 10.0;
    config
        .generation
        .areas
        .insert("grid".to_string(), LatLng::new(50.0, 50.0));
    config.generation.default_area = "grid".to_string();
    config
}

// ============================================================================
// Stop creation
// ============================================================================

#[test]
fn manual_stops_are_pending_normal_and_grow_the_matrix() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    assert_eq!(ids, vec![StopId(1), StopId(2), StopId(3)]);
    assert_eq!(session.matrix_dim(), 3);
    for stop in session.stops() {
        assert_eq!(stop.state, Lifecycle::Pending);
        assert_eq!(stop.role, Role::Normal);
        assert_eq!(stop.zone, None);
    }
}

#[test]
fn adding_a_stop_queries_only_new_pairs() {
    let (session, _) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
    let before = session.backend().queries();
    session.add_stop(LatLng::new(5.0, 5.0)).unwrap();
    assert_eq!(session.backend().queries() - before, 4);
    assert_eq!(session.matrix_dim(), 5);
}

#[test]
fn unsnappable_stop_is_rejected_without_changing_state() {
    let (session, _) = session_with(&[(0.0, 0.0)]);
    let err = session.add_stop(LatLng::new(5000.0, 0.0)).unwrap_err();
    assert!(matches!(err, PlannerError::NoNearbyNetwork { .. }));
    assert_eq!(session.stops().len(), 1);
    assert_eq!(session.matrix_dim(), 1);
}

#[test]
fn generation_is_reproducible_with_a_seed() {
    let a = Session::new(GridBackend::default(), grid_generation_config(12)).unwrap();
    let b = Session::new(GridBackend::default(), grid_generation_config(12)).unwrap();
    assert_eq!(a.generate(None, Some(9)).unwrap(), 12);
    assert_eq!(b.generate(Some("unknown-area"), Some(9)).unwrap(), 12);

    assert_eq!(a.stops(), b.stops());
    assert_eq!(a.matrix_dim(), 12);
    assert_eq!(a.anchors(), (Some(StopId(1)), Some(StopId(12))));
}

#[test]
fn regeneration_replaces_stops_without_reusing_ids() {
    let session = Session::new(GridBackend::default(), grid_generation_config(5)).unwrap();
    session.generate(None, Some(1)).unwrap();
    session.generate(None, Some(2)).unwrap();
    let ids: Vec<StopId> = session.stops().iter().map(|stop| stop.id).collect();
    assert_eq!(ids, (6..=10).map(StopId).collect::<Vec<_>>());
    assert_eq!(session.matrix_dim(), 5);
    assert_eq!(session.stops()[0].matrix_index, 0);
}

#[test]
fn reset_empties_the_session() {
    let (session, _) = session_with(&[(0.0, 0.0), (1.0, 0.0)]);
    session.reset();
    assert!(session.stops().is_empty());
    assert_eq!(session.matrix_dim(), 0);
    assert_eq!(session.view().unwrap(), Default::default());
}

// ============================================================================
// Readiness
// ============================================================================

#[test]
fn offline_network_is_a_retryable_error() {
    let session = Session::new(GridBackend::offline(), config()).unwrap();
    let err = session.view().unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(session.add_stop(LatLng::new(0.0, 0.0)), Err(PlannerError::NotReady)));
    assert!(matches!(session.generate(None, Some(1)), Err(PlannerError::NotReady)));

    session.backend().set_ready(true);
    assert!(session.view().is_ok());
}

#[test]
fn outage_during_generation_keeps_existing_stops() {
    let session = Session::new(GridBackend::default(), grid_generation_config(5)).unwrap();
    session.generate(None, Some(1)).unwrap();
    let before = session.stops();

    session.backend().set_snapping(false);
    let err = session.generate(None, Some(2)).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.stops(), before);
    assert_eq!(session.matrix_dim(), 5);
    assert_eq!(session.anchors(), (Some(StopId(1)), Some(StopId(5))));

    session.backend().set_snapping(true);
    assert_eq!(session.generate(None, Some(2)).unwrap(), 5);
}

#[test]
fn generation_drops_points_off_the_network() {
    let mut config = grid_generation_config(40);
    config
        .generation
        .areas
        .insert("edge".to_string(), LatLng::new(0.0, 999.0));
    config.generation.default_area = "edge".to_string();
    let session = Session::new(GridBackend::default(), config).unwrap();

    let created = session.generate(None, Some(3)).unwrap();
    assert!(created < 40);
    assert_eq!(session.stops().len(), created);
    assert_eq!(session.matrix_dim(), created);
}

#[test]
fn invalid_config_is_rejected() {
    let config = PlannerConfig {
        two_opt_iterations: 0,
        ..PlannerConfig::default()
    };
    assert!(matches!(
        Session::new(GridBackend::default(), config),
        Err(PlannerError::Config(_))
    ));
}

// ============================================================================
// Lifecycle and selections
// ============================================================================

#[test]
fn deleted_stop_never_appears_in_routes() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);
    session.apply(ids[3], StopAction::FixEnd);
    session.apply(ids[2], StopAction::ToggleRole);
    session.apply(ids[2], StopAction::AssignZone(Some(1)));
    session.apply(ids[1], StopAction::AssignZone(Some(1)));

    assert!(session.apply(ids[2], StopAction::Delete));

    assert!(!session.global_selection().contains(&ids[2]));
    assert!(!session.priority_selection().contains(&ids[2]));
    let view = session.view().unwrap();
    assert!(view.stops.iter().all(|stop| stop.stop.id != ids[2]));
    let routes = view.global.iter().chain(&view.priority).chain(&view.zones);
    for route in routes {
        assert!(!route.stops.contains(&ids[2]), "{:?}", route.scope);
    }
    assert_eq!(session.matrix_dim(), 4);
}

#[test]
fn deleting_the_only_priority_stop_leaves_just_the_start() {
    let (session, ids) =
        session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
    session.apply(ids[3], StopAction::ToggleRole);
    session.apply(ids[0], StopAction::FixStart);
    assert_eq!(session.priority_selection(), vec![ids[0], ids[3]]);

    session.apply(ids[3], StopAction::Delete);
    assert_eq!(session.priority_selection(), vec![ids[0]]);
    assert!(session.view().unwrap().priority.is_none());

    session.clear_route();
    assert!(session.priority_selection().is_empty());
}

#[test]
fn visit_then_restore_keeps_the_stop_visited() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0)]);
    assert!(session.apply(ids[1], StopAction::Visit { advance_start: false }));
    assert!(!session.apply(ids[1], StopAction::Restore));
    assert_eq!(session.stop(ids[1]).unwrap().state, Lifecycle::Visited);
}

#[test]
fn skip_and_restore_move_stops_out_of_and_back_into_routes() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);

    session.apply(ids[1], StopAction::Skip);
    assert_eq!(session.view().unwrap().global.unwrap().stops, vec![ids[0], ids[2]]);

    session.apply(ids[1], StopAction::Restore);
    assert_eq!(session.view().unwrap().global.unwrap().stops, ids);
}

#[test]
fn visiting_with_advance_moves_the_start() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);
    session.apply(ids[0], StopAction::Visit { advance_start: false });
    session.apply(ids[1], StopAction::Visit { advance_start: true });

    let global = session.view().unwrap().global.unwrap();
    assert_eq!(global.stops, vec![ids[1], ids[2], ids[3]]);
    assert_eq!(global.metrics.distance_km, 0.0);
    assert_eq!(global.metrics.duration_secs, 2.0);
}

#[test]
fn unknown_ids_are_ignored() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0)]);
    assert!(!session.apply(StopId(99), StopAction::Delete));
    assert!(!session.apply(StopId(99), StopAction::FixStart));
    assert_eq!(session.stops().len(), ids.len());
}

// ============================================================================
// Planned routes
// ============================================================================

#[test]
fn global_route_requires_a_start() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    assert!(session.view().unwrap().global.is_none());

    session.apply(ids[2], StopAction::FixStart);
    let global = session.view().unwrap().global.unwrap();
    assert_eq!(global.scope, RouteScope::Global);
    assert_eq!(global.stops, vec![ids[2], ids[1], ids[0]]);
}

#[test]
fn global_route_keeps_visited_anchors() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.5, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);
    session.apply(ids[3], StopAction::FixEnd);
    session.apply(ids[3], StopAction::Visit { advance_start: false });

    let global = session.view().unwrap().global.unwrap();
    assert_eq!(global.stops, vec![ids[0], ids[1], ids[2], ids[3]]);
}

#[test]
fn view_marks_stop_kinds() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);
    session.apply(ids[3], StopAction::FixEnd);
    session.apply(ids[1], StopAction::ToggleRole);

    let kinds: Vec<StopKind> = session.view().unwrap().stops.iter().map(|stop| stop.kind).collect();
    assert_eq!(kinds, vec![StopKind::Start, StopKind::Priority, StopKind::Normal, StopKind::End]);
}

#[test]
fn zone_routes_follow_manual_tags() {
    let (session, ids) = session_with(&[
        (0.0, 0.0),
        (1.0, 0.0),
        (2.0, 0.0),
        (10.0, 10.0),
        (11.0, 10.0),
        (12.0, 10.0),
    ]);
    session.apply(ids[0], StopAction::FixStart);
    let west = BoundingBox::from_corners(LatLng::new(-1.0, -1.0), LatLng::new(1.0, 2.5));
    let east = BoundingBox::from_corners(LatLng::new(9.0, 9.5), LatLng::new(11.0, 12.5));
    assert_eq!(session.assign_zone_in_bounds(&west, 0), 3);
    assert_eq!(session.assign_zone_in_bounds(&east, 1), 3);

    let zones = session.view().unwrap().zones;
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].scope, RouteScope::Zone(0));
    assert_eq!(zones[0].stops, vec![ids[0], ids[1], ids[2]]);
    assert_eq!(zones[1].scope, RouteScope::Zone(1));
    assert_eq!(zones[1].stops, vec![ids[3], ids[4], ids[5]]);

    assert_eq!(session.clear_zones(Some(0)), 3);
    assert_eq!(session.view().unwrap().zones.len(), 1);
}

#[test]
fn zone_with_a_single_stop_has_no_route() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0)]);
    session.apply(ids[1], StopAction::AssignZone(Some(4)));
    assert!(session.view().unwrap().zones.is_empty());
}

#[test]
fn sequence_route_measures_the_given_order() {
    let (session, ids) = session_with(&[(0.0, 0.0), (3.0, 0.0), (3.0, 4.0)]);
    let route = session.sequence_route(&[ids[2], ids[0], ids[1], StopId(77)]).unwrap();
    assert_eq!(route.stops, vec![ids[2], ids[0], ids[1]]);
    assert_eq!(route.metrics.duration_secs, 8.0);
    assert_eq!(route.scope, RouteScope::Sequence);

    let single = session.sequence_route(&[ids[0]]).unwrap();
    assert_eq!(single.metrics.duration_secs, 0.0);
    assert_eq!(single.metrics.duration_label(), "0m");
}

#[test]
fn routes_carry_geometry() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    session.apply(ids[0], StopAction::FixStart);
    let global = session.view().unwrap().global.unwrap();
    assert_eq!(global.geometry.len(), 3);
}

// ============================================================================
// Automatic zoning
// ============================================================================

#[test]
fn auto_zone_groups_nearby_pending_stops() {
    let mut config = config();
    config.cluster_threshold = 5.0;
    let session = Session::new(GridBackend::default(), config).unwrap();
    let ids: Vec<StopId> = [(0.0, 0.0), (1.0, 0.0), (20.0, 0.0), (21.0, 1.0), (40.0, 40.0)]
        .iter()
        .map(|&(x, y)| session.add_stop(LatLng::new(y, x)).unwrap())
        .collect();
    session.apply(ids[1], StopAction::AssignZone(Some(9)));

    assert_eq!(session.auto_zone().unwrap(), 3);

    let zone = |id: StopId| session.stop(id).unwrap().zone;
    assert_eq!(zone(ids[0]), zone(ids[1]));
    assert_eq!(zone(ids[2]), zone(ids[3]));
    let distinct: HashSet<_> = [zone(ids[0]), zone(ids[2]), zone(ids[4])].into_iter().collect();
    assert_eq!(distinct.len(), 3);
    assert!(!distinct.contains(&Some(9)));
}

#[test]
fn auto_zone_separates_unreachable_stops() {
    let session = Session::new(GridBackend::default(), config()).unwrap();
    let near = session.add_stop(LatLng::new(99.0, 0.0)).unwrap();
    let far = session.add_stop(LatLng::new(101.0, 0.0)).unwrap();
    assert_eq!(session.auto_zone().unwrap(), 2);
    assert_ne!(session.stop(near).unwrap().zone, session.stop(far).unwrap().zone);
}

#[test]
fn auto_zone_ignores_non_pending_stops() {
    let (session, ids) = session_with(&[(0.0, 0.0), (1.0, 0.0)]);
    session.apply(ids[1], StopAction::Skip);
    assert_eq!(session.auto_zone().unwrap(), 1);
    assert_eq!(session.stop(ids[0]).unwrap().zone, Some(0));
    assert_eq!(session.stop(ids[1]).unwrap().zone, None);
}
