//! Per-vessel trajectories.

use std::collections::BTreeMap;

use ais_map_vessel_models::{EnrichedReport, Mmsi};
use geo::LineString;

/// The time-ordered track of one vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Vessel identifier.
    pub mmsi: Mmsi,
    /// `(longitude, latitude)` positions, oldest first.
    pub line: LineString<f64>,
}

/// Groups rows by vessel and orders each group by timestamp.
///
/// Vessels with a single usable position have no line and are omitted.
#[must_use]
pub fn trajectories(rows: &[EnrichedReport]) -> Vec<Trajectory> {
    let mut by_vessel: BTreeMap<Mmsi, Vec<&EnrichedReport>> = BTreeMap::new();

    for row in rows {
        if row.report.latitude.is_finite() && row.report.longitude.is_finite() {
            by_vessel.entry(row.report.mmsi).or_default().push(row);
        }
    }

    by_vessel
        .into_iter()
        .filter(|(_, points)| points.len() > 1)
        .map(|(mmsi, mut points)| {
            points.sort_by_key(|r| r.report.timestamp);
            Trajectory {
                mmsi,
                line: points
                    .iter()
                    .map(|r| (r.report.longitude, r.report.latitude))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use ais_map_vessel_models::Report;
    use chrono::{DateTime, Utc};

    use super::*;

    fn row(mmsi: u32, longitude: f64, seconds: i64) -> EnrichedReport {
        EnrichedReport::join(
            Report {
                mmsi: Mmsi::new(mmsi),
                latitude: 43.0,
                longitude,
                cog: None,
                sog: None,
                timestamp: DateTime::<Utc>::from_timestamp(seconds, 0).unwrap(),
            },
            None,
        )
    }

    #[test]
    fn lines_are_time_ordered_per_vessel() {
        let rows = vec![row(1, 7.2, 20), row(2, 5.0, 0), row(1, 7.0, 0), row(1, 7.1, 10)];
        let tracks = trajectories(&rows);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].mmsi, Mmsi::new(1));
        let lons: Vec<f64> = tracks[0].line.coords().map(|c| c.x).collect();
        assert_eq!(lons, vec![7.0, 7.1, 7.2]);
    }
}
