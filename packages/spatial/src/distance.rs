//! Great-circle distance.

use geo::{Distance as _, Haversine};

use crate::LatLon;

/// Haversine distance between two positions, in metres.
#[must_use]
pub fn haversine_m(from: LatLon, to: LatLon) -> f64 {
    Haversine.distance(from.to_point(), to.to_point())
}
