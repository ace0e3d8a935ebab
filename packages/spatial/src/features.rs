//! `GeoJSON` output for renderers.

use ais_map_vessel_models::EnrichedReport;
use geo::Polygon;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::footprint::{FootprintConfig, synthesize, synthesize_disc};
use crate::trajectory::Trajectory;

/// How a vessel is drawn.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FootprintShape {
    /// Oriented hull outline with an arrow tip.
    #[default]
    Arrow,
    /// Disc sized by hull length.
    Disc,
}

/// Builds the footprint of `row` in the given shape.
#[must_use]
pub fn footprint(
    row: &EnrichedReport,
    shape: FootprintShape,
    config: &FootprintConfig,
) -> Option<Polygon<f64>> {
    match shape {
        FootprintShape::Arrow => synthesize(row, config),
        FootprintShape::Disc => synthesize_disc(row, config),
    }
}

/// Tooltip properties shared by every vessel feature.
#[must_use]
pub fn report_properties(row: &EnrichedReport) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("mmsi".to_string(), JsonValue::from(row.report.mmsi.value()));
    properties.insert("shipType".to_string(), JsonValue::from(row.ship_type.clone()));
    properties.insert("chartType".to_string(), JsonValue::from(row.chart_type.clone()));
    properties.insert("length".to_string(), JsonValue::from(row.offsets.length()));
    properties.insert("width".to_string(), JsonValue::from(row.offsets.width()));
    properties.insert("draft".to_string(), JsonValue::from(row.draft));
    properties.insert("sog".to_string(), JsonValue::from(row.report.sog));
    properties.insert(
        "timestamp".to_string(),
        JsonValue::from(row.report.timestamp.to_rfc3339()),
    );
    properties
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// One polygon feature per row that has a footprint.
///
/// `decorate` receives the row's index in `rows` and may add properties
/// (a color, for instance). Rows without geometry are skipped.
#[must_use]
pub fn footprint_collection(
    rows: &[EnrichedReport],
    shape: FootprintShape,
    config: &FootprintConfig,
    mut decorate: impl FnMut(usize, &mut JsonObject),
) -> FeatureCollection {
    let features: Vec<Feature> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let polygon = footprint(row, shape, config)?;
            let mut properties = report_properties(row);
            decorate(i, &mut properties);
            Some(feature(Geometry::new((&polygon).into()), properties))
        })
        .collect();

    let skipped = rows.len() - features.len();
    if skipped > 0 {
        log::debug!("{skipped} of {} rows have no footprint", rows.len());
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// One line feature per trajectory.
#[must_use]
pub fn trajectory_collection(trajectories: &[Trajectory]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: trajectories
            .iter()
            .map(|t| {
                let mut properties = JsonObject::new();
                properties.insert("mmsi".to_string(), JsonValue::from(t.mmsi.value()));
                feature(Geometry::new((&t.line).into()), properties)
            })
            .collect(),
        foreign_members: None,
    }
}

/// The outside mask of an extent as polygon features.
#[must_use]
pub fn mask_collection(mask: &[Polygon<f64>]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: mask
            .iter()
            .map(|band| feature(Geometry::new(band.into()), JsonObject::new()))
            .collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use ais_map_vessel_models::{HullOffsets, Mmsi, Report};
    use chrono::{DateTime, Utc};

    use super::*;

    fn row(offsets: HullOffsets) -> EnrichedReport {
        let mut enriched = EnrichedReport::join(
            Report {
                mmsi: Mmsi::new(227_000_001),
                latitude: 43.5,
                longitude: 7.5,
                cog: Some(45.0),
                sog: Some(12.0),
                timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            },
            None,
        );
        enriched.offsets = offsets;
        enriched
    }

    #[test]
    fn rows_without_geometry_are_skipped_but_indexed() {
        let rows = vec![
            row(HullOffsets::default()),
            row(HullOffsets::from_raw(Some(50.0), Some(10.0), Some(5.0), Some(5.0))),
        ];
        let mut seen = Vec::new();
        let collection = footprint_collection(
            &rows,
            FootprintShape::Arrow,
            &FootprintConfig::default(),
            |i, props| {
                seen.push(i);
                props.insert("color".to_string(), JsonValue::from("#0000ff"));
            },
        );

        assert_eq!(collection.features.len(), 1);
        assert_eq!(seen, vec![1]);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["color"], "#0000ff");
        assert_eq!(props["mmsi"], 227_000_001);
    }

    #[test]
    fn disc_shape_always_has_geometry() {
        let rows = vec![row(HullOffsets::default())];
        let collection =
            footprint_collection(&rows, FootprintShape::Disc, &FootprintConfig::default(), |_, _| {});
        assert_eq!(collection.features.len(), 1);
    }

    #[test]
    fn shape_parses_case_insensitively() {
        assert_eq!("DISC".parse::<FootprintShape>().unwrap(), FootprintShape::Disc);
        assert_eq!(FootprintShape::Arrow.to_string(), "arrow");
    }
}
