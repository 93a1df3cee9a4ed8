//! Test fixtures for stop-planner.
//!
//! Provides:
//! - A planar grid backend with exact, hand-checkable costs
//! - Real Ciudad Nezahualcóyotl locations for OSRM-backed tests

pub mod grid;
pub mod neza_locations;

#[allow(unused_imports)]
pub use grid::*;
#[allow(unused_imports)]
pub use neza_locations::*;
