//! OSRM HTTP adapter for snapping, path costs and geometry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::error::PlannerError;
use crate::polyline::Polyline;
use crate::traits::{CostOracle, LatLng, Metric, NetworkSnapper, PathCost, Vertex, VertexRef};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    /// Profile whose durations serve as grouping costs, typically one that
    /// slows down major roads.
    ///
    /// When unset, grouping falls back to plain road distance and automatic
    /// zones will happily span avenues. Set this for zoning over OSRM.
    pub grouping_profile: Option<String>,
    pub timeout_secs: u64,
    /// How long a successful readiness probe is trusted.
    pub ready_ttl_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            grouping_profile: None,
            timeout_secs: 10,
            ready_ttl_secs: 5,
        }
    }
}

#[derive(Debug, Error)]
enum OracleError {
    #[error("no route between vertices")]
    Unreachable,
    #[error("OSRM transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed OSRM response")]
    MalformedResponse,
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
    last_ready: Arc<Mutex<Option<Instant>>>,
    grouping_fallback_warned: Arc<AtomicBool>,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            last_ready: Arc::new(Mutex::new(None)),
            grouping_fallback_warned: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Profile and metric answering a query for `metric`.
    fn source_for(&self, metric: Metric) -> (&str, Metric) {
        match (metric, &self.config.grouping_profile) {
            (Metric::Grouping, Some(profile)) => (profile.as_str(), Metric::Time),
            (Metric::Grouping, None) => {
                if !self.grouping_fallback_warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        profile = %self.config.profile,
                        "no grouping profile configured, zoning on road distance"
                    );
                }
                (self.config.profile.as_str(), Metric::Distance)
            }
            (metric, _) => (self.config.profile.as_str(), metric),
        }
    }

    fn probe(&self) -> bool {
        self.client
            .get(format!("{}/nearest/v1/{}/0,0", self.config.base_url, self.config.profile))
            .send()
            .is_ok()
    }

    fn route(&self, profile: &str, from: LatLng, to: LatLng, geometry: bool) -> Result<OsrmRoute, OracleError> {
        let overview = if geometry { "full&geometries=geojson" } else { "false" };
        let url = format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview={}",
            self.config.base_url, profile, from.lng, from.lat, to.lng, to.lat, overview
        );

        let body = self
            .client
            .get(url)
            .send()?
            .json::<OsrmRouteResponse>()?;

        match body.code.as_str() {
            "Ok" => body
                .routes
                .unwrap_or_default()
                .into_iter()
                .next()
                .ok_or(OracleError::MalformedResponse),
            "NoRoute" | "NoSegment" => Err(OracleError::Unreachable),
            _ => Err(OracleError::MalformedResponse),
        }
    }

    fn nearest(&self, location: LatLng) -> Result<Option<OsrmWaypoint>, reqwest::Error> {
        let url = format!(
            "{}/nearest/v1/{}/{:.6},{:.6}?number=1",
            self.config.base_url, self.config.profile, location.lng, location.lat
        );
        let body = self
            .client
            .get(url)
            .send()?
            .json::<OsrmNearestResponse>()?;

        if body.code != "Ok" {
            return Ok(None);
        }
        Ok(body.waypoints.unwrap_or_default().into_iter().next())
    }

    fn cost(&self, from: &Vertex, to: &Vertex, metric: Metric) -> Result<f64, OracleError> {
        let (profile, metric) = self.source_for(metric);
        let route = self.route(profile, from.location, to.location, false)?;
        Ok(match metric {
            Metric::Time => route.duration,
            _ => route.distance,
        })
    }
}

impl NetworkSnapper for OsrmClient {
    fn snap(&self, location: LatLng) -> Result<Vertex, PlannerError> {
        match self.nearest(location) {
            Ok(Some(waypoint)) => {
                let id = waypoint
                    .nodes
                    .iter()
                    .copied()
                    .find(|node| *node != 0)
                    .unwrap_or_default();
                Ok(Vertex {
                    id: VertexRef(id),
                    location: LatLng::new(waypoint.location[1], waypoint.location[0]),
                })
            }
            Ok(None) => Err(PlannerError::NoNearbyNetwork {
                lat: location.lat,
                lng: location.lng,
            }),
            Err(err) => {
                warn!(%err, "OSRM nearest request failed");
                Err(PlannerError::NotReady)
            }
        }
    }
}

impl CostOracle for OsrmClient {
    /// Any HTTP answer from the server counts as ready. A success is reused
    /// for `ready_ttl_secs`; failures are never cached.
    fn is_ready(&self) -> bool {
        let ttl = Duration::from_secs(self.config.ready_ttl_secs);
        let mut last_ready = self.last_ready.lock();
        if last_ready.is_some_and(|at| at.elapsed() < ttl) {
            return true;
        }
        let ready = self.probe();
        *last_ready = ready.then(Instant::now);
        ready
    }

    fn path_cost(&self, from: &Vertex, to: &Vertex, metric: Metric) -> PathCost {
        match self.cost(from, to, metric) {
            Ok(cost) => PathCost::Cost(cost),
            Err(OracleError::Unreachable) => PathCost::Infeasible,
            Err(err) => {
                warn!(%err, from = from.id.0, to = to.id.0, "OSRM cost query failed");
                PathCost::Infeasible
            }
        }
    }

    fn path_geometry(&self, from: &Vertex, to: &Vertex) -> Option<Polyline> {
        let route = self
            .route(&self.config.profile, from.location, to.location, true)
            .ok()?;
        let coordinates = route.geometry?.coordinates;
        Some(Polyline::new(
            coordinates
                .into_iter()
                .map(|[lng, lat]| LatLng::new(lat, lng))
                .collect(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
    distance: f64,
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmNearestResponse {
    code: String,
    waypoints: Option<Vec<OsrmWaypoint>>,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    location: [f64; 2],
    #[serde(default)]
    nodes: Vec<u64>,
}
