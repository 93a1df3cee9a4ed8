//! Real Ciudad Nezahualcóyotl / Lindavista locations.
//!
//! Coordinates sourced from OpenStreetMap. They are routable with OSRM
//! Mexico extracts.

#![allow(dead_code)]

use stop_planner::traits::LatLng;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

pub const NEZA: &[Location] = &[
    Location::new("Palacio Municipal Nezahualcóyotl", 19.4006, -99.0146),
    Location::new("Plaza Ciudad Jardín Bicentenario", 19.4040, -99.0237),
    Location::new("Estadio Neza 86", 19.4165, -99.0111),
    Location::new("Metro Pantitlán", 19.4154, -99.0721),
    Location::new("Metro Nezahualcóyotl", 19.4294, -99.0359),
];

pub const LINDAVISTA: &[Location] = &[
    Location::new("IPN Zacatenco", 19.5026, -99.1336),
    Location::new("Metro Lindavista", 19.4870, -99.1351),
    Location::new("Basílica de Guadalupe", 19.4846, -99.1178),
];
