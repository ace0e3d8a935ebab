//! Display filters applied after assembly.
//!
//! Sampling is seeded so the same dataset always shows the same points.

use std::collections::{BTreeMap, BTreeSet};

use ais_map_vessel_models::{EnrichedReport, Mmsi};
use chrono::{DateTime, Utc};
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::index;

/// Keeps the rows whose charted type is one of `labels`.
#[must_use]
pub fn filter_by_type(rows: &[EnrichedReport], labels: &BTreeSet<String>) -> Vec<EnrichedReport> {
    rows.iter()
        .filter(|r| labels.contains(&r.chart_type))
        .cloned()
        .collect()
}

/// Picks `amount` of `len` positions with a fresh generator seeded by
/// `seed`, returned in ascending order.
fn sample_positions(len: usize, amount: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = index::sample(&mut rng, len, amount).into_vec();
    positions.sort_unstable();
    positions
}

/// Keeps at most a quota of rows per vessel.
///
/// Vessels without an entry in `quotas` keep half of their rows, rounded
/// up. Each vessel is sampled with its own generator seeded by `seed`, and
/// the output is grouped by vessel with the original order kept inside
/// each group.
#[must_use]
pub fn sample_per_vessel(
    rows: &[EnrichedReport],
    quotas: &BTreeMap<Mmsi, usize>,
    seed: u64,
) -> Vec<EnrichedReport> {
    let mut by_vessel: BTreeMap<Mmsi, Vec<&EnrichedReport>> = BTreeMap::new();
    for row in rows {
        by_vessel.entry(row.report.mmsi).or_default().push(row);
    }

    let mut sampled = Vec::new();

    for (mmsi, group) in by_vessel {
        let quota = quotas
            .get(&mmsi)
            .copied()
            .unwrap_or_else(|| group.len().div_ceil(2));

        if group.len() > quota {
            sampled.extend(
                sample_positions(group.len(), quota, seed)
                    .into_iter()
                    .map(|i| group[i].clone()),
            );
        } else {
            sampled.extend(group.into_iter().cloned());
        }
    }

    sampled
}

/// The result of [`cap_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct CappedRows {
    /// Displayed rows, oldest first.
    pub rows: Vec<EnrichedReport>,
    /// Whether rows were dropped.
    pub truncated: bool,
    /// Latest timestamp still displayed, when rows were dropped.
    pub latest_displayed: Option<DateTime<Utc>>,
}

/// Caps the displayed rows at `max_points` and orders them by time.
///
/// When the cap applies, a seeded sample is kept and the latest displayed
/// timestamp is reported so callers can warn that later points are
/// missing.
#[must_use]
pub fn cap_points(rows: &[EnrichedReport], max_points: usize, seed: u64) -> CappedRows {
    let truncated = rows.len() > max_points;

    let mut kept: Vec<EnrichedReport> = if truncated {
        sample_positions(rows.len(), max_points, seed)
            .into_iter()
            .map(|i| rows[i].clone())
            .collect()
    } else {
        rows.to_vec()
    };

    kept.sort_by_key(|r| r.report.timestamp);

    let latest_displayed = if truncated {
        let latest = kept.last().map(|r| r.report.timestamp);
        if let Some(latest) = latest {
            log::warn!(
                "Displaying {max_points} of {} points, up to {latest}",
                rows.len()
            );
        }
        latest
    } else {
        None
    };

    CappedRows {
        rows: kept,
        truncated,
        latest_displayed,
    }
}

/// Distinct charted types of `rows`, most frequent first, ties by name.
#[must_use]
pub fn category_labels(rows: &[EnrichedReport]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.chart_type.as_str()).or_default() += 1;
    }

    let mut labels: Vec<(&str, usize)> = counts.into_iter().collect();
    labels.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    labels.into_iter().map(|(label, _)| label.to_string()).collect()
}
