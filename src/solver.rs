//! Route optimizer: nearest-neighbor construction followed by bounded 2-opt.
//!
//! The optimizer works on matrix indices only. It never fails: unreachable
//! pairs are already penalty costs in the matrix, and an exhausted iteration
//! cap simply returns the best tour found so far.

use tracing::debug;

use crate::matrix::CostMatrix;
use crate::traits::LatLng;

/// Improvements smaller than this are treated as float noise.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Maximum 2-opt sweeps over the tour.
    pub two_opt_iterations: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            two_opt_iterations: 50,
        }
    }
}

/// Optional fixed endpoints of a tour, as matrix indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteAnchors {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RouteAnchors {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn start(start: usize) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }
}

/// Orders `active` into a visiting sequence.
///
/// * A start or end outside `active` is ignored.
/// * Without a start, the stop with the smallest easting seeds the tour
///   (lowest index on ties). `positions` is indexed by matrix index.
/// * A start equal to the end is treated as a start only.
///
/// The result is a permutation of the distinct entries of `active`.
pub fn optimize(
    active: &[usize],
    matrix: &CostMatrix,
    anchors: RouteAnchors,
    positions: &[LatLng],
    options: &SolveOptions,
) -> Vec<usize> {
    let mut pending = dedup_preserving_order(active);
    if pending.len() < 2 {
        return pending;
    }

    let mut end = anchors.end.filter(|end| pending.contains(end));
    let start = anchors.start.filter(|start| pending.contains(start));
    if start.is_some() && start == end {
        end = None;
    }

    let seed = start.unwrap_or_else(|| westmost(&pending, end, positions));
    pending.retain(|&index| index != seed && Some(index) != end);

    let mut tour = nearest_neighbor(seed, pending, matrix);
    if let Some(end) = end {
        tour.push(end);
    }

    let constructed = matrix.path_cost(&tour);
    let iterations = two_opt(&mut tour, matrix, end.is_some(), options.two_opt_iterations);
    debug!(
        stops = tour.len(),
        constructed,
        improved = matrix.path_cost(&tour),
        iterations,
        "route optimized"
    );

    tour
}

/// Greedy construction from `seed` through every index in `pending`.
///
/// Picks the cheapest next stop from the current tail; ties go to the
/// candidate listed first. When every remaining candidate is unreachable from
/// the tail, the first remaining candidate is taken.
pub fn nearest_neighbor(seed: usize, mut pending: Vec<usize>, matrix: &CostMatrix) -> Vec<usize> {
    let mut tour = Vec::with_capacity(pending.len() + 1);
    tour.push(seed);
    let mut current = seed;

    while !pending.is_empty() {
        let mut best_position = 0;
        let mut best_cost = f64::INFINITY;
        for (position, &candidate) in pending.iter().enumerate() {
            let cost = matrix.get(current, candidate);
            if cost < best_cost {
                best_cost = cost;
                best_position = position;
            }
        }

        if matrix.is_infeasible(current, pending[best_position]) {
            debug!(from = current, "no reachable candidate, taking next pending stop");
            best_position = 0;
        }

        current = pending.remove(best_position);
        tour.push(current);
    }

    tour
}

/// In-place 2-opt over `tour`, keeping the first stop fixed and, when
/// `pinned_end` is set, the last one too.
///
/// Reverses `tour[i..j]` whenever that lowers `cost(i-1, i) + cost(j-1, j)`.
/// Stops after a sweep without improvement or after `max_iterations` sweeps,
/// returning the number of sweeps made. The tour cost never increases.
pub fn two_opt(tour: &mut [usize], matrix: &CostMatrix, pinned_end: bool, max_iterations: usize) -> usize {
    let limit = if pinned_end {
        tour.len().saturating_sub(1)
    } else {
        tour.len()
    };

    let mut iterations = 0;
    let mut improved = true;
    while improved && iterations < max_iterations {
        improved = false;
        iterations += 1;

        for i in 1..limit.saturating_sub(1) {
            for j in i + 2..limit {
                let (a, b) = (tour[i - 1], tour[i]);
                let (c, d) = (tour[j - 1], tour[j]);
                let current = matrix.get(a, b) + matrix.get(c, d);
                let candidate = matrix.get(a, c) + matrix.get(b, d);
                if candidate < current - IMPROVEMENT_EPSILON {
                    tour[i..j].reverse();
                    improved = true;
                }
            }
        }
    }

    iterations
}

fn westmost(candidates: &[usize], end: Option<usize>, positions: &[LatLng]) -> usize {
    let easting = |index: usize| {
        positions
            .get(index)
            .map(LatLng::easting)
            .unwrap_or(f64::INFINITY)
    };

    let mut ranked: Vec<usize> = candidates.to_vec();
    ranked.sort_by(|&a, &b| easting(a).total_cmp(&easting(b)).then(a.cmp(&b)));

    ranked
        .iter()
        .copied()
        .find(|&index| Some(index) != end)
        .unwrap_or(ranked[0])
}

fn dedup_preserving_order(indices: &[usize]) -> Vec<usize> {
    let mut seen = std::collections::HashSet::with_capacity(indices.len());
    indices
        .iter()
        .copied()
        .filter(|index| seen.insert(*index))
        .collect()
}
