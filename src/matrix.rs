//! Dense pairwise cost matrix over stops.
//!
//! Row/column `i` belongs to the stop whose matrix index is `i`. The matrix only
//! ever grows: [`CostMatrix::append_one`] adds a single stop with `O(N)` oracle
//! queries, and rows of deleted stops are kept so indices stay valid.

use rayon::prelude::*;
use tracing::warn;

use crate::traits::{CostOracle, Metric, PathCost, Vertex};

#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    metric: Metric,
    penalty: f64,
    rows: Vec<Vec<f64>>,
}

impl CostMatrix {
    pub fn empty(metric: Metric, penalty: f64) -> Self {
        Self {
            metric,
            penalty,
            rows: Vec::new(),
        }
    }

    /// Wraps precomputed rows. Used by callers that already hold costs.
    pub fn from_rows(metric: Metric, penalty: f64, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == rows.len()));
        Self {
            metric,
            penalty,
            rows,
        }
    }

    /// Queries the oracle once per unordered pair and mirrors the result.
    ///
    /// Unreachable pairs get `penalty` instead of an error.
    pub fn build<O>(oracle: &O, vertices: &[Vertex], metric: Metric, penalty: f64) -> Self
    where
        O: CostOracle + ?Sized,
    {
        let n = vertices.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| pair_cost(oracle, &vertices[i], &vertices[j], metric, penalty))
                    .collect()
            })
            .collect();

        let mut rows = vec![vec![0.0; n]; n];
        for (i, tail) in upper.into_iter().enumerate() {
            for (offset, cost) in tail.into_iter().enumerate() {
                let j = i + 1 + offset;
                rows[i][j] = cost;
                rows[j][i] = cost;
            }
        }

        Self {
            metric,
            penalty,
            rows,
        }
    }

    /// Adds one row/column for `new`, querying only `(existing, new)` pairs.
    ///
    /// `existing` must be the vertices of rows `0..dim()` in order.
    pub fn append_one<O>(&mut self, oracle: &O, existing: &[Vertex], new: &Vertex)
    where
        O: CostOracle + ?Sized,
    {
        debug_assert_eq!(existing.len(), self.rows.len());
        let column: Vec<f64> = existing
            .iter()
            .map(|vertex| pair_cost(oracle, vertex, new, self.metric, self.penalty))
            .collect();

        for (row, cost) in self.rows.iter_mut().zip(&column) {
            row.push(*cost);
        }
        let mut last = column;
        last.push(0.0);
        self.rows.push(last);
    }

    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }

    /// True when the entry stands for an unreachable pair.
    #[inline]
    pub fn is_infeasible(&self, from: usize, to: usize) -> bool {
        self.rows[from][to] >= self.penalty
    }

    /// Sum of consecutive leg costs along `order`.
    pub fn path_cost(&self, order: &[usize]) -> f64 {
        order.windows(2).map(|leg| self.get(leg[0], leg[1])).sum()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

fn pair_cost<O>(oracle: &O, from: &Vertex, to: &Vertex, metric: Metric, penalty: f64) -> f64
where
    O: CostOracle + ?Sized,
{
    let cost = oracle.path_cost(from, to, metric);
    if cost.is_infeasible() {
        warn!(
            from = from.id.0,
            to = to.id.0,
            ?metric,
            penalty,
            "no path between vertices, using penalty cost"
        );
    }
    match cost {
        PathCost::Cost(value) if value.is_finite() => value.min(penalty),
        _ => penalty,
    }
}
