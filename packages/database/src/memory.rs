//! In-memory [`ReportStore`] for tests and offline runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use ais_map_database_models::{DestinationRow, StaticRow, TimeRange};
use ais_map_vessel_models::{Mmsi, Report};
use chrono::{DateTime, Utc};

use crate::DbError;
use crate::queries::{DESTINATIONS_PER_VESSEL, NO_DESTINATION};
use crate::selector::Retrieval;
use crate::store::ReportStore;

/// A voyage message: vessel, declared destination, time.
pub type VoyageRow = (Mmsi, Option<String>, DateTime<Utc>);

/// Holds AIS rows in memory and counts round trips.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: Vec<Report>,
    statics: Vec<StaticRow>,
    voyages: Vec<VoyageRow>,
    unavailable: bool,
    round_trips: AtomicUsize,
}

impl MemoryStore {
    /// A store holding the given reports.
    #[must_use]
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            reports,
            ..Self::default()
        }
    }

    /// A store whose every call fails with [`DbError::Connection`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Adds static vessel rows.
    #[must_use]
    pub fn with_static(mut self, statics: Vec<StaticRow>) -> Self {
        self.statics = statics;
        self
    }

    /// Adds voyage messages.
    #[must_use]
    pub fn with_voyages(mut self, voyages: Vec<VoyageRow>) -> Self {
        self.voyages = voyages;
        self
    }

    /// Number of calls answered (or failed) so far.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    fn round_trip(&self) -> Result<(), DbError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);

        if self.unavailable {
            return Err(DbError::Connection {
                message: "in-memory store marked unavailable".to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryStore {
    async fn reports(&self, retrieval: &Retrieval<'_>) -> Result<Vec<Report>, DbError> {
        self.round_trip()?;
        Ok(retrieval.evaluate(&self.reports))
    }

    async fn static_rows(&self, mmsis: &BTreeSet<Mmsi>) -> Result<Vec<StaticRow>, DbError> {
        if mmsis.is_empty() {
            return Ok(Vec::new());
        }
        self.round_trip()?;

        Ok(self
            .statics
            .iter()
            .filter(|row| mmsis.contains(&row.mmsi))
            .cloned()
            .collect())
    }

    async fn destinations(
        &self,
        range: &TimeRange,
        mmsis: &BTreeSet<Mmsi>,
    ) -> Result<Vec<DestinationRow>, DbError> {
        if mmsis.is_empty() {
            return Ok(Vec::new());
        }
        self.round_trip()?;

        let mut by_vessel: BTreeMap<Mmsi, Vec<&VoyageRow>> = BTreeMap::new();
        for voyage in &self.voyages {
            if mmsis.contains(&voyage.0) && range.contains(&voyage.2) {
                by_vessel.entry(voyage.0).or_default().push(voyage);
            }
        }

        let limit = usize::try_from(DESTINATIONS_PER_VESSEL).unwrap_or(usize::MAX);
        let mut rows = Vec::new();

        for (mmsi, mut voyages) in by_vessel {
            voyages.sort_by(|a, b| b.2.cmp(&a.2));
            rows.extend(voyages.into_iter().take(limit).map(|(_, dest, _)| DestinationRow {
                mmsi,
                destination: dest.clone().unwrap_or_else(|| NO_DESTINATION.to_string()),
            }));
        }

        Ok(rows)
    }
}
