//! Joining reports with static vessel attributes.

use std::collections::{BTreeMap, BTreeSet};

use ais_map_database::{ReportStore, SelectError, SelectionCache};
use ais_map_database_models::{SelectionFilter, StaticRow};
use ais_map_vessel_models::{
    EnrichedReport, HullOffsets, Mmsi, OTHER_SHIP_TYPE, Report, UNKNOWN_SHIP_TYPE,
    VesselAttributes, available,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::DatasetConfig;

/// Which reports of each vessel are kept.
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
pub enum AssembleMode {
    /// Every report.
    #[default]
    All,
    /// Only the most recent report of each vessel.
    Latest,
}

/// The output of [`assemble`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Static attributes by vessel.
    pub attributes: BTreeMap<Mmsi, VesselAttributes>,
    /// Reports joined with their vessel's attributes.
    pub enriched: Vec<EnrichedReport>,
    /// Distinct vessels of the selected reports.
    pub identifiers: BTreeSet<Mmsi>,
}

/// Builds the attributes table from static rows.
///
/// Missing declared types read "Unknown". Zero offsets and drafts are
/// missing. A declared type held by less than `rare_type_threshold` of the
/// vessels is charted as "Other"; the display type is kept as declared.
/// Only the first row of a duplicated vessel is used.
#[must_use]
pub fn build_attributes(
    rows: &[StaticRow],
    rare_type_threshold: f64,
) -> BTreeMap<Mmsi, VesselAttributes> {
    let mut attributes: BTreeMap<Mmsi, VesselAttributes> = BTreeMap::new();

    for row in rows {
        attributes.entry(row.mmsi).or_insert_with(|| {
            let ship_type = row
                .ship_type
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SHIP_TYPE.to_string());

            VesselAttributes {
                mmsi: row.mmsi,
                chart_type: ship_type.clone(),
                ship_type,
                ship_type_id: row.ship_type_id,
                offsets: HullOffsets::from_raw(row.a, row.b, row.c, row.d),
                draft: available(row.draft),
            }
        });
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for attrs in attributes.values() {
        *counts.entry(attrs.ship_type.clone()).or_default() += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let total = attributes.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let rare: BTreeSet<String> = counts
        .into_iter()
        .filter(|(_, count)| (*count as f64) / total < rare_type_threshold)
        .map(|(ship_type, _)| ship_type)
        .collect();

    if !rare.is_empty() {
        log::debug!("Charting {} rare type(s) as {OTHER_SHIP_TYPE}", rare.len());
    }

    for attrs in attributes.values_mut() {
        if rare.contains(&attrs.ship_type) {
            attrs.chart_type = OTHER_SHIP_TYPE.to_string();
        }
    }

    attributes
}

/// Joins `reports` with `attributes` (left outer, by vessel).
///
/// In [`AssembleMode::Latest`] only the most recent report of each vessel
/// is kept and the output is ordered by vessel.
#[must_use]
pub fn assemble(
    reports: &[Report],
    attributes: BTreeMap<Mmsi, VesselAttributes>,
    mode: AssembleMode,
) -> Dataset {
    let identifiers: BTreeSet<Mmsi> = reports.iter().map(|r| r.mmsi).collect();

    let kept: Vec<&Report> = match mode {
        AssembleMode::All => reports.iter().collect(),
        AssembleMode::Latest => {
            let mut latest: BTreeMap<Mmsi, &Report> = BTreeMap::new();
            for report in reports {
                latest
                    .entry(report.mmsi)
                    .and_modify(|current| {
                        if report.timestamp > current.timestamp {
                            *current = report;
                        }
                    })
                    .or_insert(report);
            }
            latest.into_values().collect()
        }
    };

    let enriched = kept
        .into_iter()
        .map(|r| EnrichedReport::join(r.clone(), attributes.get(&r.mmsi)))
        .collect();

    Dataset {
        attributes,
        enriched,
        identifiers,
    }
}

/// Selects reports for `filter` (through `cache`), looks up the static
/// attributes of their vessels and assembles the dataset.
///
/// # Errors
///
/// * [`SelectError::InvalidFilter`] if the filter has neither a zone nor a
///   vessel list.
/// * [`SelectError::StoreUnavailable`] if either store lookup fails.
pub async fn assemble_from_store(
    store: &dyn ReportStore,
    cache: &SelectionCache,
    filter: &SelectionFilter,
    mode: AssembleMode,
    config: &DatasetConfig,
) -> Result<Dataset, SelectError> {
    let reports = cache.select(store, filter).await?;
    let identifiers: BTreeSet<Mmsi> = reports.iter().map(|r| r.mmsi).collect();

    let statics = store
        .static_rows(&identifiers)
        .await
        .map_err(SelectError::StoreUnavailable)?;

    log::debug!(
        "Assembling {} reports of {} vessels ({} with static data), mode={mode}",
        reports.len(),
        identifiers.len(),
        statics.len()
    );

    let attributes = build_attributes(&statics, config.rare_type_threshold);

    Ok(assemble(&reports, attributes, mode))
}

#[cfg(test)]
mod tests {
    use ais_map_database::memory::MemoryStore;
    use ais_map_database_models::{BoundingBox, TimeRange};
    use chrono::{DateTime, Duration, Utc};

    use super::*;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap() + Duration::hours(hours)
    }

    fn report(mmsi: u32, hours: i64) -> Report {
        Report {
            mmsi: Mmsi::new(mmsi),
            latitude: 43.5,
            longitude: 7.5,
            cog: Some(0.0),
            sog: Some(10.0),
            timestamp: at(hours),
        }
    }

    fn static_row(mmsi: u32, ship_type: Option<&str>) -> StaticRow {
        StaticRow {
            mmsi: Mmsi::new(mmsi),
            ship_type: ship_type.map(str::to_string),
            ship_type_id: None,
            a: Some(50.0),
            b: Some(10.0),
            c: Some(0.0),
            d: Some(6.0),
            draft: Some(0.0),
        }
    }

    #[test]
    fn rare_types_collapse_to_other() {
        let mut rows = Vec::new();
        let mut mmsi = 0;
        for (ship_type, count) in [
            ("Cargo", 50),
            ("Tanker", 45),
            ("Tug", 1),
            ("Pilot", 1),
            ("Sailing", 1),
            ("Dredger", 1),
            ("Ferry", 1),
        ] {
            for _ in 0..count {
                mmsi += 1;
                rows.push(static_row(mmsi, Some(ship_type)));
            }
        }

        let attributes = build_attributes(&rows, 0.02);
        let charted: BTreeSet<&str> = attributes.values().map(|a| a.chart_type.as_str()).collect();
        assert_eq!(charted, BTreeSet::from(["Cargo", "Other", "Tanker"]));

        let declared: BTreeSet<&str> = attributes.values().map(|a| a.ship_type.as_str()).collect();
        assert_eq!(declared.len(), 7);
    }

    #[test]
    fn missing_type_and_zero_values_are_normalized() {
        let attributes = build_attributes(&[static_row(1, None)], 0.02);
        let attrs = &attributes[&Mmsi::new(1)];
        assert_eq!(attrs.ship_type, UNKNOWN_SHIP_TYPE);
        assert_eq!(attrs.offsets.port, None);
        assert_eq!(attrs.draft, None);
        assert_eq!(attrs.length(), Some(60.0));
        assert_eq!(attrs.width(), Some(6.0));
    }

    #[test]
    fn all_mode_keeps_every_row_and_left_joins() {
        let reports = vec![report(1, 1), report(1, 2), report(2, 3)];
        let attributes = build_attributes(&[static_row(1, Some("Cargo"))], 0.02);
        let dataset = assemble(&reports, attributes, AssembleMode::All);

        assert_eq!(dataset.enriched.len(), 3);
        assert_eq!(dataset.identifiers.len(), 2);
        assert_eq!(dataset.enriched[0].ship_type, "Cargo");
        assert_eq!(dataset.enriched[2].ship_type, UNKNOWN_SHIP_TYPE);
        assert_eq!(dataset.enriched[2].chart_type, UNKNOWN_SHIP_TYPE);
    }

    #[test]
    fn latest_mode_keeps_most_recent_per_vessel() {
        let reports = vec![report(1, 1), report(2, 9), report(1, 5), report(1, 3)];
        let dataset = assemble(&reports, BTreeMap::new(), AssembleMode::Latest);

        let kept: Vec<(u32, DateTime<Utc>)> = dataset
            .enriched
            .iter()
            .map(|r| (r.report.mmsi.value(), r.report.timestamp))
            .collect();
        assert_eq!(kept, vec![(1, at(5)), (2, at(9))]);
    }

    #[test]
    fn mode_parses_from_query_strings() {
        assert_eq!("latest".parse::<AssembleMode>().unwrap(), AssembleMode::Latest);
        assert_eq!(AssembleMode::All.to_string(), "all");
    }

    #[tokio::test]
    async fn assembles_from_store() {
        let store = MemoryStore::new(vec![report(1, 1), report(2, 2)])
            .with_static(vec![static_row(1, Some("Cargo"))]);
        let cache = SelectionCache::new();
        let filter = SelectionFilter::new(TimeRange::new(at(0), at(24)))
            .with_bbox(BoundingBox::from_bounds(43.0, 44.0, 7.0, 8.0));

        let dataset = assemble_from_store(
            &store,
            &cache,
            &filter,
            AssembleMode::All,
            &DatasetConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(dataset.enriched.len(), 2);
        assert_eq!(dataset.attributes.len(), 1);
        assert_eq!(store.round_trips(), 2);
    }
}
