//! Seedable random stop generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::registry::Role;
use crate::traits::{BoundingBox, LatLng};

/// A generated stop before it is snapped onto the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopDraft {
    pub location: LatLng,
    pub role: Role,
}

/// Draws stops uniformly inside a region. The same seed yields the same
/// stops.
#[derive(Debug, Clone)]
pub struct StopFactory {
    rng: StdRng,
}

impl StopFactory {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// `priority_ratio` is clamped to `[0, 1]`.
    pub fn generate(&mut self, count: usize, region: &BoundingBox, priority_ratio: f64) -> Vec<StopDraft> {
        let ratio = if priority_ratio.is_nan() {
            0.0
        } else {
            priority_ratio.clamp(0.0, 1.0)
        };

        (0..count)
            .map(|_| {
                let location = LatLng::new(
                    self.rng.random_range(region.min.lat..=region.max.lat),
                    self.rng.random_range(region.min.lng..=region.max.lng),
                );
                let role = if self.rng.random_bool(ratio) {
                    Role::Priority
                } else {
                    Role::Normal
                };
                StopDraft { location, role }
            })
            .collect()
    }
}
