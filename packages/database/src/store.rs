//! The AIS store boundary.

use std::collections::BTreeSet;
use std::sync::Arc;

use ais_map_database_models::{DestinationRow, StaticRow, TimeRange};
use ais_map_vessel_models::{Mmsi, Report};
use switchy_database::Database;

use crate::DbError;
use crate::queries;
use crate::selector::Retrieval;

/// Read access to the AIS tables.
///
/// Each method is exactly one round trip.
#[async_trait::async_trait]
pub trait ReportStore: Send + Sync {
    /// Executes a report retrieval plan.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot answer.
    async fn reports(&self, retrieval: &Retrieval<'_>) -> Result<Vec<Report>, DbError>;

    /// Looks up static attributes for the given vessels.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot answer.
    async fn static_rows(&self, mmsis: &BTreeSet<Mmsi>) -> Result<Vec<StaticRow>, DbError>;

    /// Returns up to ten recent declared destinations per vessel within
    /// `range`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store cannot answer.
    async fn destinations(
        &self,
        range: &TimeRange,
        mmsis: &BTreeSet<Mmsi>,
    ) -> Result<Vec<DestinationRow>, DbError>;
}

/// [`ReportStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PostgresStore {
    db: Arc<dyn Database>,
}

impl PostgresStore {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Opens a connection from `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the connection fails.
    pub async fn connect_from_env() -> Result<Self, DbError> {
        let db = crate::db::connect_from_env().await?;
        Ok(Self::new(Arc::from(db)))
    }

    /// The underlying connection.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }
}

#[async_trait::async_trait]
impl ReportStore for PostgresStore {
    async fn reports(&self, retrieval: &Retrieval<'_>) -> Result<Vec<Report>, DbError> {
        queries::query_reports(self.db.as_ref(), retrieval).await
    }

    async fn static_rows(&self, mmsis: &BTreeSet<Mmsi>) -> Result<Vec<StaticRow>, DbError> {
        queries::query_static(self.db.as_ref(), mmsis).await
    }

    async fn destinations(
        &self,
        range: &TimeRange,
        mmsis: &BTreeSet<Mmsi>,
    ) -> Result<Vec<DestinationRow>, DbError> {
        queries::query_destinations(self.db.as_ref(), range, mmsis).await
    }
}
