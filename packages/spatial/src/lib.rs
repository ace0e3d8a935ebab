#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry for AIS maps.
//!
//! Great-circle distances, map framing (center, extent and an
//! aspect-preserving canvas), oriented vessel footprints built in Web
//! Mercator metres, and per-vessel trajectories. Everything here is pure;
//! no function touches the store.

pub mod distance;
pub mod features;
pub mod footprint;
pub mod framing;
pub mod trajectory;

use serde::{Deserialize, Serialize};

pub use distance::haversine_m;
pub use features::{FootprintShape, footprint, footprint_collection, mask_collection, trajectory_collection};
pub use footprint::{FootprintConfig, synthesize, synthesize_disc};
pub use framing::{CanvasSize, Extent, FrameSource, FramingConfig, FramingError, MapFrame, frame};
pub use trajectory::{Trajectory, trajectories};

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LatLon {
    /// Creates a position.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// The position as a `geo` point (x = longitude, y = latitude).
    #[must_use]
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}
