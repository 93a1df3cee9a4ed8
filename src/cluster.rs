//! Zone clustering by complete-linkage agglomeration.
//!
//! Runs over a grouping-cost matrix ([`Metric::Grouping`](crate::traits::Metric)),
//! where major roads are already penalised by the oracle, so zones do not span
//! stops that are only close across a highway.

use tracing::debug;

use crate::matrix::CostMatrix;

/// Groups `indices` so that every pair inside a group costs less than
/// `threshold`.
///
/// Two groups merge while their complete linkage (the largest pairwise cost
/// between their members) is below `threshold`; the cheapest pair merges
/// first. Groups are returned sorted by their first member, members in the
/// order they appear in `indices`.
pub fn cluster(indices: &[usize], matrix: &CostMatrix, threshold: f64) -> Vec<Vec<usize>> {
    if indices.len() < 2 {
        return indices.iter().map(|&index| vec![index]).collect();
    }

    let ceiling = matrix.penalty();
    let cost = |a: usize, b: usize| {
        let value = matrix.get(a, b).max(matrix.get(b, a));
        if value.is_finite() { value.min(ceiling) } else { ceiling }
    };

    // positions into `indices`; `None` once merged away
    let mut groups: Vec<Option<Vec<usize>>> = (0..indices.len()).map(|i| Some(vec![i])).collect();
    let mut linkage: Vec<Vec<f64>> = (0..indices.len())
        .map(|i| {
            (0..indices.len())
                .map(|j| cost(indices[i], indices[j]))
                .collect()
        })
        .collect();

    let mut merges = 0;
    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..groups.len() {
            if groups[a].is_none() {
                continue;
            }
            for b in a + 1..groups.len() {
                if groups[b].is_none() {
                    continue;
                }
                let value = linkage[a][b];
                if value < threshold && best.is_none_or(|(_, _, current)| value < current) {
                    best = Some((a, b, value));
                }
            }
        }

        let Some((keep, absorb, _)) = best else {
            break;
        };

        let absorbed = groups[absorb].take().unwrap_or_default();
        if let Some(members) = groups[keep].as_mut() {
            members.extend(absorbed);
        }
        for other in 0..groups.len() {
            let merged = linkage[keep][other].max(linkage[absorb][other]);
            linkage[keep][other] = merged;
            linkage[other][keep] = merged;
        }
        merges += 1;
    }

    let mut result: Vec<Vec<usize>> = groups
        .into_iter()
        .flatten()
        .map(|mut members| {
            members.sort_unstable();
            members.into_iter().map(|position| indices[position]).collect()
        })
        .collect();
    result.sort_by_key(|members: &Vec<usize>| {
        indices.iter().position(|index| *index == members[0]).unwrap_or(usize::MAX)
    });

    debug!(stops = indices.len(), groups = result.len(), merges, threshold, "clustered stops");
    result
}
