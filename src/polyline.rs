//! Polyline representation for route geometries.
//!
//! Geometry is only consumed by rendering; the optimizer and clustering never
//! look at it.

use serde::{Deserialize, Serialize};

use crate::traits::LatLng;

/// A route geometry as decoded coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<LatLng>,
}

impl Polyline {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    pub fn into_points(self) -> Vec<LatLng> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends a leg, dropping its first point when it repeats our last one.
    pub fn extend_leg(&mut self, leg: Polyline) {
        let mut points = leg.points.into_iter().peekable();
        if let (Some(last), Some(first)) = (self.points.last(), points.peek()) {
            if last == first {
                points.next();
            }
        }
        self.points.extend(points);
    }
}

impl FromIterator<Polyline> for Polyline {
    fn from_iter<I: IntoIterator<Item = Polyline>>(legs: I) -> Self {
        let mut joined = Polyline::default();
        for leg in legs {
            joined.extend_leg(leg);
        }
        joined
    }
}
