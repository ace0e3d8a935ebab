#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the AIS map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the engine types so the API contract can evolve on its own.

use ais_map_color::{Legend, Rgb};
use ais_map_dataset::AssembleMode;
use ais_map_database_models::DestinationRow;
use ais_map_spatial::MapFrame;
use ais_map_spatial::features::FootprintShape;
use ais_map_vessel_models::{EnrichedReport, Mmsi};
use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

/// Query parameters shared by the map endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapQueryParams {
    /// Start of the reporting window (ISO 8601).
    pub from: DateTime<Utc>,
    /// End of the reporting window (ISO 8601).
    pub to: DateTime<Utc>,
    /// Start of the trajectory window, for two-phase selection.
    pub from2: Option<DateTime<Utc>>,
    /// End of the trajectory window, for two-phase selection.
    pub to2: Option<DateTime<Utc>>,
    /// Bounding box as `west,south,east,north`.
    pub bbox: Option<String>,
    /// Drawn zone as a `GeoJSON` polygon (used when `bbox` is absent).
    pub zone: Option<String>,
    /// Vessel list, 9-digit MMSIs separated by commas or whitespace.
    pub mmsis: Option<String>,
    /// Every report or only the latest per vessel.
    pub mode: Option<AssembleMode>,
    /// Numeric attribute driving the color ramp (`sog`, `draft`).
    pub color: Option<String>,
    /// Color by charted ship type.
    pub color_by_type: Option<bool>,
    /// Comma-separated charted types to keep.
    pub types: Option<String>,
    /// Footprint shape.
    pub shape: Option<FootprintShape>,
    /// Maximum displayed rows.
    pub max_points: Option<usize>,
    /// Maximum rows per vessel, for explicit vessel lists.
    pub per_vessel: Option<usize>,
}

/// Query parameters of the destinations endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationQueryParams {
    /// Start of the window (ISO 8601).
    pub from: DateTime<Utc>,
    /// End of the window (ISO 8601).
    pub to: DateTime<Utc>,
    /// Vessel list, 9-digit MMSIs separated by commas or whitespace.
    pub mmsis: String,
}

/// A displayed report with its color.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// The joined report.
    #[serde(flatten)]
    pub report: EnrichedReport,
    /// Overall length in metres.
    pub length: Option<f64>,
    /// Overall beam in metres.
    pub width: Option<f64>,
    /// Display color.
    pub color: Rgb,
}

impl ApiReport {
    /// Wraps a row with its color.
    #[must_use]
    pub fn new(report: EnrichedReport, color: Rgb) -> Self {
        Self {
            length: report.offsets.length(),
            width: report.offsets.width(),
            report,
            color,
        }
    }
}

/// Everything a renderer needs to draw one map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMapView {
    /// Center, extent and canvas size; absent when nothing can be framed.
    pub frame: Option<MapFrame>,
    /// Displayed reports, oldest first.
    pub reports: Vec<ApiReport>,
    /// Vessel footprints.
    pub footprints: FeatureCollection,
    /// Bands dimming everything outside the drawn zone.
    pub mask: Option<FeatureCollection>,
    /// Legend content.
    pub legend: Legend,
    /// Distinct vessels of the selection.
    pub identifiers: Vec<Mmsi>,
    /// Charted types available to the type filter, most frequent first.
    pub categories: Vec<String>,
    /// Whether the point cap dropped rows.
    pub truncated: bool,
    /// Latest timestamp still displayed when rows were dropped.
    pub latest_displayed: Option<DateTime<Utc>>,
}

/// Trajectories of the selected vessels.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrajectories {
    /// Center, extent and canvas size; absent when nothing can be framed.
    pub frame: Option<MapFrame>,
    /// One line per vessel.
    pub trajectories: FeatureCollection,
    /// Displayed reports along the lines, oldest first.
    pub reports: Vec<ApiReport>,
    /// Legend content.
    pub legend: Legend,
    /// Whether the point cap dropped rows.
    pub truncated: bool,
    /// Latest timestamp still displayed when rows were dropped.
    pub latest_displayed: Option<DateTime<Utc>>,
}

/// Recent destinations of one vessel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDestinations {
    /// Vessel identifier.
    pub mmsi: Mmsi,
    /// Declared destinations, most recent first.
    pub destinations: Vec<String>,
}

impl ApiDestinations {
    /// Groups destination rows by vessel, keeping their order.
    #[must_use]
    pub fn group(rows: Vec<DestinationRow>) -> Vec<Self> {
        let mut grouped: Vec<Self> = Vec::new();
        for row in rows {
            match grouped.last_mut() {
                Some(last) if last.mmsi == row.mmsi => last.destinations.push(row.destination),
                _ => grouped.push(Self {
                    mmsi: row.mmsi,
                    destinations: vec![row.destination],
                }),
            }
        }
        grouped
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_destinations_by_vessel() {
        let row = |mmsi: u32, destination: &str| DestinationRow {
            mmsi: Mmsi::new(mmsi),
            destination: destination.to_string(),
        };
        let grouped = ApiDestinations::group(vec![
            row(1, "MONACO"),
            row(1, "NICE"),
            row(2, "No destination"),
        ]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].destinations, vec!["MONACO", "NICE"]);
        assert_eq!(grouped[1].mmsi, Mmsi::new(2));
    }

    #[test]
    fn parses_query_params() {
        let params: MapQueryParams = serde_json::from_value(serde_json::json!({
            "from": "2025-01-01T00:00:00Z",
            "to": "2025-01-02T00:00:00Z",
            "bbox": "7,43,8,44",
            "mode": "latest",
            "shape": "disc",
            "colorByType": true,
        }))
        .unwrap();
        assert_eq!(params.mode, Some(AssembleMode::Latest));
        assert_eq!(params.shape, Some(FootprintShape::Disc));
        assert_eq!(params.color_by_type, Some(true));
        assert!(params.from2.is_none());
    }
}
