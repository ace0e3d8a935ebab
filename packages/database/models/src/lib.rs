#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Selection filter and store row definitions.
//!
//! These types describe what is asked of the AIS store (a time window, an
//! optional zone, an optional vessel list) and the raw shapes of the
//! auxiliary rows it returns. Position reports themselves are
//! [`ais_map_vessel_models::Report`].

use std::collections::BTreeSet;

use ais_map_vessel_models::Mmsi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 coordinates.
///
/// All four edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary (minimum longitude).
    pub west: f64,
    /// Southern latitude boundary (minimum latitude).
    pub south: f64,
    /// Eastern longitude boundary (maximum longitude).
    pub east: f64,
    /// Northern latitude boundary (maximum latitude).
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Creates a bounding box from user-supplied edges.
    ///
    /// # Errors
    ///
    /// * If any edge is `NaN` or infinite
    /// * If `west > east` or `south > north`
    pub fn try_new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BoundingBoxError> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(BoundingBoxError::NonFinite);
        }
        if west > east || south > north {
            return Err(BoundingBoxError::Swapped);
        }
        Ok(Self::new(west, south, east, north))
    }

    /// Creates a bounding box from min/max latitude and longitude, swapping
    /// reversed bounds so that `south <= north` and `west <= east`.
    #[must_use]
    pub fn from_bounds(min_lat: f64, max_lat: f64, min_long: f64, max_long: f64) -> Self {
        Self {
            west: min_long.min(max_long),
            south: min_lat.min(max_lat),
            east: min_long.max(max_long),
            north: min_lat.max(max_lat),
        }
    }

    /// Whether the point lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude) && (self.west..=self.east).contains(&longitude)
    }
}

/// Error returned when a user-supplied bounding box is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundingBoxError {
    /// Not four comma-separated numbers.
    #[error("expected west,south,east,north")]
    Malformed,

    /// An edge is `NaN` or infinite.
    #[error("edges must be finite numbers")]
    NonFinite,

    /// West lies east of east, or south north of north.
    #[error("corners are swapped")]
    Swapped,
}

impl std::str::FromStr for BoundingBox {
    type Err = BoundingBoxError;

    /// Parses `"west,south,east,north"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BoundingBoxError::Malformed)?;

        let [west, south, east, north] = parts[..] else {
            return Err(BoundingBoxError::Malformed);
        };

        Self::try_new(west, south, east, north)
    }
}

/// An inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// First instant included.
    pub start: DateTime<Utc>,
    /// Last instant included.
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a time window.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether the instant lies inside the window, edges included.
    #[must_use]
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        (self.start..=self.end).contains(instant)
    }
}

/// What a visualization asks of the store.
///
/// A usable filter has at least a zone or a non-empty vessel list. When
/// `trajectory_range` is set the retrieval runs in two phases: the zone
/// and/or list select vessels during `time_range`, then every report of
/// those vessels inside `trajectory_range` is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionFilter {
    /// Reporting window (phase A window in two-phase mode).
    pub time_range: TimeRange,
    /// Second window for two-phase (trajectory) retrieval.
    pub trajectory_range: Option<TimeRange>,
    /// Spatial zone filter.
    pub bbox: Option<BoundingBox>,
    /// Vessel list filter (empty = not filtered by vessel).
    #[serde(default)]
    pub mmsis: BTreeSet<Mmsi>,
}

impl SelectionFilter {
    /// A single-phase filter over `time_range` with no zone or vessel list.
    #[must_use]
    pub const fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            trajectory_range: None,
            bbox: None,
            mmsis: BTreeSet::new(),
        }
    }

    /// Restricts the filter to a zone.
    #[must_use]
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Restricts the filter to a vessel list.
    #[must_use]
    pub fn with_mmsis(mut self, mmsis: impl IntoIterator<Item = Mmsi>) -> Self {
        self.mmsis = mmsis.into_iter().collect();
        self
    }

    /// Switches the filter to two-phase retrieval.
    #[must_use]
    pub fn with_trajectory_range(mut self, range: TimeRange) -> Self {
        self.trajectory_range = Some(range);
        self
    }

    /// Whether the user supplied an explicit vessel list.
    #[must_use]
    pub fn has_vessel_list(&self) -> bool {
        !self.mmsis.is_empty()
    }
}

/// A row of the static vessel table as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRow {
    /// Vessel identifier.
    pub mmsi: Mmsi,
    /// Declared type label.
    pub ship_type: Option<String>,
    /// Declared type code.
    pub ship_type_id: Option<i32>,
    /// Reference point to bow.
    pub a: Option<f64>,
    /// Reference point to stern.
    pub b: Option<f64>,
    /// Reference point to port.
    pub c: Option<f64>,
    /// Reference point to starboard.
    pub d: Option<f64>,
    /// Draft in metres.
    pub draft: Option<f64>,
}

/// One recent declared destination of a vessel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRow {
    /// Vessel identifier.
    pub mmsi: Mmsi,
    /// Declared destination.
    pub destination: String,
}
