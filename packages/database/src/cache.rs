//! Memoization of report retrievals within a visualization cycle.
//!
//! A cycle begins when the user changes the filter. Entries whose filter
//! differs from the new one are dropped, so repeated renders of the same
//! filter cost one round trip and a changed filter is always re-fetched.
//! Concurrent misses on the same filter share a single retrieval.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ais_map_database_models::{SelectionFilter, TimeRange};
use ais_map_vessel_models::{Mmsi, Report};
use tokio::sync::OnceCell;

use crate::selector::{SelectError, select};
use crate::store::ReportStore;

/// Bit pattern of a coordinate, with `-0.0` folded onto `0.0`.
fn coordinate_bits(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

/// Normalized, hashable form of a [`SelectionFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterKey {
    time_range: TimeRange,
    trajectory_range: Option<TimeRange>,
    bbox: Option<[u64; 4]>,
    mmsis: BTreeSet<Mmsi>,
}

impl From<&SelectionFilter> for FilterKey {
    fn from(filter: &SelectionFilter) -> Self {
        Self {
            time_range: filter.time_range,
            trajectory_range: filter.trajectory_range,
            bbox: filter.bbox.map(|b| {
                [
                    coordinate_bits(b.west),
                    coordinate_bits(b.south),
                    coordinate_bits(b.east),
                    coordinate_bits(b.north),
                ]
            }),
            mmsis: filter.mmsis.clone(),
        }
    }
}

/// A retrieval that is either in flight or done.
type Entry = Arc<OnceCell<Arc<Vec<Report>>>>;

/// Filter-keyed cache of selected reports.
#[derive(Debug, Default)]
pub struct SelectionCache {
    entries: Mutex<HashMap<FilterKey, Entry>>,
}

impl SelectionCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FilterKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a visualization cycle for `filter`, keeping only its entry.
    pub fn begin_cycle(&self, filter: &SelectionFilter) {
        let key = FilterKey::from(filter);
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| *k == key);
        if entries.len() != before {
            log::debug!("Dropped {} stale selection(s)", before - entries.len());
        }
    }

    /// Drops every entry.
    pub fn invalidate(&self) {
        self.lock().clear();
    }

    /// Number of memoized filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the memoized reports for `filter`, retrieving them on a miss.
    ///
    /// Callers that miss while a retrieval of the same filter is in flight
    /// wait for it instead of issuing their own. Failures are not memoized:
    /// the entry is dropped and the next call retries.
    ///
    /// # Errors
    ///
    /// Propagates [`SelectError`] from [`select`].
    pub async fn select(
        &self,
        store: &dyn ReportStore,
        filter: &SelectionFilter,
    ) -> Result<Arc<Vec<Report>>, SelectError> {
        let key = FilterKey::from(filter);

        let entry = Arc::clone(self.lock().entry(key.clone()).or_default());

        if let Some(hit) = entry.get() {
            log::trace!("Selection cache hit");
            return Ok(Arc::clone(hit));
        }

        let result = entry
            .get_or_try_init(|| async { select(store, filter).await.map(Arc::new) })
            .await;

        match result {
            Ok(reports) => Ok(Arc::clone(reports)),
            Err(e) => {
                let mut entries = self.lock();
                if entries
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &entry) && !current.initialized())
                {
                    entries.remove(&key);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ais_map_database_models::BoundingBox;
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::memory::MemoryStore;

    fn day() -> TimeRange {
        let start = DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap();
        TimeRange::new(start, start + Duration::days(1))
    }

    fn report() -> Report {
        Report {
            mmsi: Mmsi::new(227_000_001),
            latitude: 43.5,
            longitude: 7.5,
            cog: None,
            sog: None,
            timestamp: day().start,
        }
    }

    #[tokio::test]
    async fn repeated_filter_costs_one_round_trip() {
        let store = MemoryStore::new(vec![report()]);
        let cache = SelectionCache::new();
        let filter = SelectionFilter::new(day()).with_bbox(BoundingBox::from_bounds(43.0, 44.0, 7.0, 8.0));

        let first = cache.select(&store, &filter).await.unwrap();
        let second = cache.select(&store, &filter).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.round_trips(), 1);
    }

    #[tokio::test]
    async fn negative_zero_matches_zero() {
        let store = MemoryStore::new(vec![report()]);
        let cache = SelectionCache::new();
        let a = SelectionFilter::new(day()).with_bbox(BoundingBox::new(0.0, 43.0, 8.0, 44.0));
        let b = SelectionFilter::new(day()).with_bbox(BoundingBox::new(-0.0, 43.0, 8.0, 44.0));

        cache.select(&store, &a).await.unwrap();
        cache.select(&store, &b).await.unwrap();

        assert_eq!(store.round_trips(), 1);
    }

    #[tokio::test]
    async fn new_cycle_drops_other_filters() {
        let store = MemoryStore::new(vec![report()]);
        let cache = SelectionCache::new();
        let zone = SelectionFilter::new(day()).with_bbox(BoundingBox::from_bounds(43.0, 44.0, 7.0, 8.0));
        let list = SelectionFilter::new(day()).with_mmsis([Mmsi::new(227_000_001)]);

        cache.select(&store, &zone).await.unwrap();
        cache.select(&store, &list).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.begin_cycle(&list);
        assert_eq!(cache.len(), 1);

        cache.select(&store, &zone).await.unwrap();
        assert_eq!(store.round_trips(), 3);

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failures_are_not_memoized() {
        let store = MemoryStore::unavailable();
        let cache = SelectionCache::new();
        let filter = SelectionFilter::new(day()).with_mmsis([Mmsi::new(1)]);

        assert!(cache.select(&store, &filter).await.is_err());
        assert!(cache.is_empty());
    }

    /// Yields before each retrieval so concurrent callers interleave.
    struct Yielding(MemoryStore);

    #[async_trait::async_trait]
    impl ReportStore for Yielding {
        async fn reports(
            &self,
            retrieval: &crate::selector::Retrieval<'_>,
        ) -> Result<Vec<Report>, crate::DbError> {
            tokio::task::yield_now().await;
            self.0.reports(retrieval).await
        }

        async fn static_rows(
            &self,
            mmsis: &BTreeSet<Mmsi>,
        ) -> Result<Vec<ais_map_database_models::StaticRow>, crate::DbError> {
            self.0.static_rows(mmsis).await
        }

        async fn destinations(
            &self,
            range: &TimeRange,
            mmsis: &BTreeSet<Mmsi>,
        ) -> Result<Vec<ais_map_database_models::DestinationRow>, crate::DbError> {
            self.0.destinations(range, mmsis).await
        }
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_retrieval() {
        let store = Yielding(MemoryStore::new(vec![report()]));
        let cache = SelectionCache::new();
        let filter = SelectionFilter::new(day()).with_mmsis([Mmsi::new(227_000_001)]);

        let (first, second) = tokio::join!(
            cache.select(&store, &filter),
            cache.select(&store, &filter)
        );

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(store.0.round_trips(), 1);
        assert_eq!(cache.len(), 1);
    }
}
