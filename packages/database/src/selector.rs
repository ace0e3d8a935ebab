//! Query shape selection.
//!
//! A [`SelectionFilter`] is classified once into a [`QueryShape`] (which
//! filter dimensions are populated) and wrapped in a [`Retrieval`] (single
//! or two-phase). Everything downstream matches on these enums instead of
//! re-checking which optional fields are set.

use std::collections::BTreeSet;

use ais_map_database_models::{BoundingBox, SelectionFilter, TimeRange};
use ais_map_vessel_models::{Mmsi, Report};

use crate::DbError;
use crate::store::ReportStore;

/// Errors returned by [`select`].
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// Neither a zone nor a vessel list was supplied.
    #[error("Invalid filter: a bounding box or a vessel list is required")]
    InvalidFilter,

    /// The store could not answer the retrieval.
    #[error("AIS store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),
}

/// Which filter dimensions constrain the reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryShape<'a> {
    /// Only a vessel list.
    Identifiers(&'a BTreeSet<Mmsi>),
    /// Only a zone.
    Zone(BoundingBox),
    /// Both a zone and a vessel list (intersection).
    ZoneAndIdentifiers(BoundingBox, &'a BTreeSet<Mmsi>),
}

impl<'a> QueryShape<'a> {
    /// Classifies the populated dimensions of `filter`.
    ///
    /// An empty vessel list counts as "no list".
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidFilter`] when neither a zone nor a
    /// vessel list is present.
    pub fn classify(filter: &'a SelectionFilter) -> Result<Self, SelectError> {
        let mmsis = Some(&filter.mmsis).filter(|m| !m.is_empty());

        match (filter.bbox, mmsis) {
            (None, None) => Err(SelectError::InvalidFilter),
            (None, Some(mmsis)) => Ok(Self::Identifiers(mmsis)),
            (Some(bbox), None) => Ok(Self::Zone(bbox)),
            (Some(bbox), Some(mmsis)) => Ok(Self::ZoneAndIdentifiers(bbox, mmsis)),
        }
    }

    /// Whether a report satisfies the spatial and identity constraints
    /// (time is checked separately).
    #[must_use]
    pub fn admits(&self, report: &Report) -> bool {
        match self {
            Self::Identifiers(mmsis) => mmsis.contains(&report.mmsi),
            Self::Zone(bbox) => bbox.contains(report.latitude, report.longitude),
            Self::ZoneAndIdentifiers(bbox, mmsis) => {
                mmsis.contains(&report.mmsi) && bbox.contains(report.latitude, report.longitude)
            }
        }
    }

    /// Short name used in log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identifiers(_) => "identifiers",
            Self::Zone(_) => "zone",
            Self::ZoneAndIdentifiers(..) => "zone+identifiers",
        }
    }
}

/// A retrieval plan for the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Retrieval<'a> {
    /// Reports matching `shape` inside `range`.
    SinglePhase {
        /// Spatial/identity constraint.
        shape: QueryShape<'a>,
        /// Reporting window.
        range: TimeRange,
    },
    /// Vessels matching `shape` inside `zone_range`, then all of their
    /// reports inside `trajectory_range` wherever they are.
    TwoPhase {
        /// Constraint selecting the vessels.
        shape: QueryShape<'a>,
        /// Window in which the vessels must match `shape`.
        zone_range: TimeRange,
        /// Window of the returned reports.
        trajectory_range: TimeRange,
    },
}

impl<'a> Retrieval<'a> {
    /// Builds the plan for `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError::InvalidFilter`] when the filter has neither a
    /// zone nor a vessel list.
    pub fn plan(filter: &'a SelectionFilter) -> Result<Self, SelectError> {
        let shape = QueryShape::classify(filter)?;

        Ok(match filter.trajectory_range {
            None => Self::SinglePhase {
                shape,
                range: filter.time_range,
            },
            Some(trajectory_range) => Self::TwoPhase {
                shape,
                zone_range: filter.time_range,
                trajectory_range,
            },
        })
    }

    /// The spatial/identity constraint of the plan.
    #[must_use]
    pub const fn shape(&self) -> &QueryShape<'a> {
        match self {
            Self::SinglePhase { shape, .. } | Self::TwoPhase { shape, .. } => shape,
        }
    }

    /// Evaluates the plan over an in-memory rowset.
    ///
    /// Returns the matching reports ordered by timestamp, then identifier,
    /// the same order the SQL templates produce.
    #[must_use]
    pub fn evaluate(&self, reports: &[Report]) -> Vec<Report> {
        let mut selected: Vec<Report> = match self {
            Self::SinglePhase { shape, range } => reports
                .iter()
                .filter(|r| range.contains(&r.timestamp) && shape.admits(r))
                .cloned()
                .collect(),
            Self::TwoPhase {
                shape,
                zone_range,
                trajectory_range,
            } => {
                let vessels: BTreeSet<Mmsi> = reports
                    .iter()
                    .filter(|r| zone_range.contains(&r.timestamp) && shape.admits(r))
                    .map(|r| r.mmsi)
                    .collect();

                reports
                    .iter()
                    .filter(|r| {
                        vessels.contains(&r.mmsi) && trajectory_range.contains(&r.timestamp)
                    })
                    .cloned()
                    .collect()
            }
        };

        selected.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.mmsi.cmp(&b.mmsi)));
        selected
    }
}

/// Retrieves the reports matching `filter` from the store.
///
/// The filter is validated before any round trip. Store failures are not
/// retried.
///
/// # Errors
///
/// * [`SelectError::InvalidFilter`] if the filter has neither a zone nor a
///   vessel list.
/// * [`SelectError::StoreUnavailable`] if the store query fails.
pub async fn select(
    store: &dyn ReportStore,
    filter: &SelectionFilter,
) -> Result<Vec<Report>, SelectError> {
    let retrieval = Retrieval::plan(filter)?;

    log::debug!(
        "Selecting reports: shape={} two_phase={}",
        retrieval.shape().name(),
        matches!(retrieval, Retrieval::TwoPhase { .. })
    );

    let reports = store
        .reports(&retrieval)
        .await
        .map_err(SelectError::StoreUnavailable)?;

    log::debug!("Store returned {} reports", reports.len());

    Ok(reports)
}
