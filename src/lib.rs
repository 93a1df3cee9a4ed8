//! stop-planner core
//!
//! Groups delivery stops into zones, sequences them into routes over a road
//! network, and tracks each stop's lifecycle while an operator works through
//! a simulation.

pub mod traits;
pub mod error;
pub mod config;
pub mod matrix;
pub mod solver;
pub mod cluster;
pub mod registry;
pub mod factory;
pub mod route;
pub mod session;
pub mod network;
pub mod osrm;
pub mod haversine;
pub mod polyline;

pub use error::{PlannerError, Result};
pub use session::{Session, SimulationView};
