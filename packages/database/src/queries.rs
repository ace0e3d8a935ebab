//! SQL templates for the AIS store.
//!
//! Every value is bound as a numbered `$n` parameter. The report templates
//! are built from a [`Retrieval`] plan so the SQL always mirrors the plan's
//! shape; [`Retrieval::evaluate`] is the in-memory equivalent.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use ais_map_database_models::{DestinationRow, StaticRow, TimeRange};
use ais_map_vessel_models::{Mmsi, Report};
use chrono::{DateTime, NaiveDateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;
use crate::selector::{QueryShape, Retrieval};

/// Table of dynamic position reports.
pub const REPORTS_TABLE: &str = "ais_reports";

/// Table of static vessel attributes.
pub const STATIC_TABLE: &str = "vessel_static";

/// Table of voyage-related messages (destinations).
pub const VOYAGE_TABLE: &str = "voyage_data";

/// Maximum number of recent destinations returned per vessel.
pub const DESTINATIONS_PER_VESSEL: i64 = 10;

/// Label used for voyage messages without a destination.
pub const NO_DESTINATION: &str = "No destination";

/// Pushes a parameter and returns its `$n` placeholder.
fn bind(params: &mut Vec<DatabaseValue>, value: DatabaseValue) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn bind_time(params: &mut Vec<DatabaseValue>, instant: &DateTime<Utc>) -> String {
    bind(params, DatabaseValue::DateTime(instant.naive_utc()))
}

/// Writes `column IN ($a, $b, ...)` for a non-empty identifier set.
fn write_mmsi_in(sql: &mut String, params: &mut Vec<DatabaseValue>, mmsis: &BTreeSet<Mmsi>) {
    let placeholders: Vec<String> = mmsis
        .iter()
        .map(|m| bind(params, DatabaseValue::Int64(i64::from(m.value()))))
        .collect();
    write!(sql, "mmsi IN ({})", placeholders.join(", ")).unwrap();
}

/// Writes the time window plus the shape's spatial/identity predicates.
fn write_shape_condition(
    sql: &mut String,
    params: &mut Vec<DatabaseValue>,
    shape: &QueryShape<'_>,
    range: &TimeRange,
) {
    let start = bind_time(params, &range.start);
    let end = bind_time(params, &range.end);
    write!(sql, "timestamp >= {start} AND timestamp <= {end}").unwrap();

    let (bbox, mmsis) = match shape {
        QueryShape::Identifiers(mmsis) => (None, Some(*mmsis)),
        QueryShape::Zone(bbox) => (Some(bbox), None),
        QueryShape::ZoneAndIdentifiers(bbox, mmsis) => (Some(bbox), Some(*mmsis)),
    };

    if let Some(bbox) = bbox {
        let south = bind(params, DatabaseValue::Real64(bbox.south));
        let north = bind(params, DatabaseValue::Real64(bbox.north));
        let west = bind(params, DatabaseValue::Real64(bbox.west));
        let east = bind(params, DatabaseValue::Real64(bbox.east));
        write!(
            sql,
            " AND lat BETWEEN {south} AND {north} AND long BETWEEN {west} AND {east}"
        )
        .unwrap();
    }

    if let Some(mmsis) = mmsis {
        sql.push_str(" AND ");
        write_mmsi_in(sql, params, mmsis);
    }
}

/// Builds the SQL and parameters retrieving the reports of `retrieval`.
#[must_use]
pub fn report_query(retrieval: &Retrieval<'_>) -> (String, Vec<DatabaseValue>) {
    let mut params = Vec::new();
    let mut sql = String::new();

    match retrieval {
        Retrieval::SinglePhase { shape, range } => {
            write!(
                sql,
                "SELECT mmsi, lat, long, cog, sog, timestamp FROM {REPORTS_TABLE} WHERE "
            )
            .unwrap();
            write_shape_condition(&mut sql, &mut params, shape, range);
        }
        Retrieval::TwoPhase {
            shape,
            zone_range,
            trajectory_range,
        } => {
            write!(
                sql,
                "WITH zone_vessels AS (SELECT DISTINCT mmsi FROM {REPORTS_TABLE} WHERE "
            )
            .unwrap();
            write_shape_condition(&mut sql, &mut params, shape, zone_range);

            let start = bind_time(&mut params, &trajectory_range.start);
            let end = bind_time(&mut params, &trajectory_range.end);
            write!(
                sql,
                ") SELECT mmsi, lat, long, cog, sog, timestamp FROM {REPORTS_TABLE} \
                 WHERE mmsi IN (SELECT mmsi FROM zone_vessels) \
                 AND timestamp >= {start} AND timestamp <= {end}"
            )
            .unwrap();
        }
    }

    sql.push_str(" ORDER BY timestamp, mmsi");

    (sql, params)
}

const MAX_MMSI: i64 = 999_999_999;

fn parse_mmsi(raw: i64) -> Result<Mmsi, DbError> {
    if !(0..=MAX_MMSI).contains(&raw) {
        return Err(DbError::Conversion {
            message: format!("MMSI out of range: {raw}"),
        });
    }

    u32::try_from(raw)
        .map(Mmsi::new)
        .map_err(|_| DbError::Conversion {
            message: format!("MMSI out of range: {raw}"),
        })
}

/// Maps a column decode failure into [`DbError::Conversion`].
fn conversion<E: std::fmt::Display>(column: &'static str) -> impl FnOnce(E) -> DbError {
    move |e| DbError::Conversion {
        message: format!("Failed to parse column {column}: {e}"),
    }
}

fn coordinate(column: &'static str, value: f64) -> Result<f64, DbError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DbError::Conversion {
            message: format!("Non-finite {column}: {value}"),
        })
    }
}

/// Builds a [`Report`] from the decoded columns of one report row.
fn report_from_columns(
    mmsi: i64,
    lat: f64,
    long: f64,
    cog: Option<f64>,
    sog: Option<f64>,
    timestamp: NaiveDateTime,
) -> Result<Report, DbError> {
    Ok(Report {
        mmsi: parse_mmsi(mmsi)?,
        latitude: coordinate("lat", lat)?,
        longitude: coordinate("long", long)?,
        cog,
        sog,
        timestamp: DateTime::<Utc>::from_naive_utc_and_offset(timestamp, Utc),
    })
}

/// Runs the report retrieval described by `retrieval`.
///
/// Any row that fails to decode fails the whole retrieval.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a row cannot be
/// decoded.
pub async fn query_reports(
    db: &dyn Database,
    retrieval: &Retrieval<'_>,
) -> Result<Vec<Report>, DbError> {
    let (sql, params) = report_query(retrieval);
    let rows = db.query_raw_params(&sql, &params).await?;

    let mut reports = Vec::with_capacity(rows.len());

    for row in &rows {
        let mmsi: i64 = row.to_value("mmsi").map_err(conversion("mmsi"))?;
        let lat: f64 = row.to_value("lat").map_err(conversion("lat"))?;
        let long: f64 = row.to_value("long").map_err(conversion("long"))?;
        let cog: Option<f64> = row.to_value("cog").map_err(conversion("cog"))?;
        let sog: Option<f64> = row.to_value("sog").map_err(conversion("sog"))?;
        let timestamp: NaiveDateTime = row
            .to_value("timestamp")
            .map_err(conversion("timestamp"))?;

        reports.push(report_from_columns(mmsi, lat, long, cog, sog, timestamp)?);
    }

    Ok(reports)
}

/// Looks up the static attributes of the given vessels.
///
/// An empty set returns no rows without touching the database.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a row cannot be
/// decoded.
pub async fn query_static(
    db: &dyn Database,
    mmsis: &BTreeSet<Mmsi>,
) -> Result<Vec<StaticRow>, DbError> {
    if mmsis.is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut sql = format!(
        "SELECT mmsi, ship_type, ship_type_id, a, b, c, d, draft FROM {STATIC_TABLE} WHERE "
    );
    write_mmsi_in(&mut sql, &mut params, mmsis);

    let rows = db.query_raw_params(&sql, &params).await?;

    let mut statics = Vec::with_capacity(rows.len());

    for row in &rows {
        let mmsi: i64 = row.to_value("mmsi").map_err(conversion("mmsi"))?;

        statics.push(StaticRow {
            mmsi: parse_mmsi(mmsi)?,
            ship_type: row.to_value("ship_type").map_err(conversion("ship_type"))?,
            ship_type_id: row
                .to_value("ship_type_id")
                .map_err(conversion("ship_type_id"))?,
            a: row.to_value("a").map_err(conversion("a"))?,
            b: row.to_value("b").map_err(conversion("b"))?,
            c: row.to_value("c").map_err(conversion("c"))?,
            d: row.to_value("d").map_err(conversion("d"))?,
            draft: row.to_value("draft").map_err(conversion("draft"))?,
        });
    }

    Ok(statics)
}

/// Builds the SQL and parameters of the recent-destinations lookup.
#[must_use]
pub fn destination_query(
    range: &TimeRange,
    mmsis: &BTreeSet<Mmsi>,
) -> (String, Vec<DatabaseValue>) {
    let mut params = Vec::new();
    let mut sql = format!(
        "SELECT mmsi, destination FROM (\
             SELECT mmsi, destination, \
                    ROW_NUMBER() OVER (PARTITION BY mmsi ORDER BY timestamp DESC) AS rn \
             FROM {VOYAGE_TABLE} WHERE "
    );
    write_mmsi_in(&mut sql, &mut params, mmsis);

    let start = bind_time(&mut params, &range.start);
    let end = bind_time(&mut params, &range.end);
    let limit = bind(&mut params, DatabaseValue::Int64(DESTINATIONS_PER_VESSEL));
    write!(
        sql,
        " AND timestamp >= {start} AND timestamp <= {end}\
         ) sub WHERE rn <= {limit} ORDER BY mmsi, rn"
    )
    .unwrap();

    (sql, params)
}

/// Returns up to ten most recent declared destinations per vessel within
/// `range`, most recent first.
///
/// An empty set returns no rows without touching the database.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails or a row cannot be
/// decoded.
pub async fn query_destinations(
    db: &dyn Database,
    range: &TimeRange,
    mmsis: &BTreeSet<Mmsi>,
) -> Result<Vec<DestinationRow>, DbError> {
    if mmsis.is_empty() {
        return Ok(Vec::new());
    }

    let (sql, params) = destination_query(range, mmsis);
    let rows = db.query_raw_params(&sql, &params).await?;

    let mut destinations = Vec::with_capacity(rows.len());

    for row in &rows {
        let mmsi: i64 = row.to_value("mmsi").map_err(conversion("mmsi"))?;
        let destination: Option<String> = row
            .to_value("destination")
            .map_err(conversion("destination"))?;

        destinations.push(DestinationRow {
            mmsi: parse_mmsi(mmsi)?,
            destination: destination.unwrap_or_else(|| NO_DESTINATION.to_string()),
        });
    }

    Ok(destinations)
}

#[cfg(test)]
mod tests {
    use ais_map_database_models::{BoundingBox, SelectionFilter};
    use chrono::Duration;

    use super::*;

    fn day() -> TimeRange {
        let start = DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap();
        TimeRange::new(start, start + Duration::days(1))
    }

    fn zone() -> BoundingBox {
        BoundingBox::from_bounds(43.0, 44.0, 7.0, 8.0)
    }

    #[test]
    fn identifier_template_binds_each_mmsi() {
        let filter = SelectionFilter::new(day()).with_mmsis([Mmsi::new(1), Mmsi::new(2)]);
        let plan = Retrieval::plan(&filter).unwrap();
        let (sql, params) = report_query(&plan);

        assert!(sql.contains("timestamp >= $1 AND timestamp <= $2"));
        assert!(sql.contains("mmsi IN ($3, $4)"));
        assert!(!sql.contains("lat BETWEEN"));
        assert!(sql.ends_with("ORDER BY timestamp, mmsi"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn zone_template_binds_bounds_in_order() {
        let filter = SelectionFilter::new(day()).with_bbox(zone());
        let plan = Retrieval::plan(&filter).unwrap();
        let (sql, params) = report_query(&plan);

        assert!(sql.contains("lat BETWEEN $3 AND $4 AND long BETWEEN $5 AND $6"));
        assert!(!sql.contains("mmsi IN"));
        assert_eq!(params.len(), 6);
        assert!(matches!(params[2], DatabaseValue::Real64(v) if (v - 43.0).abs() < f64::EPSILON));
        assert!(matches!(params[5], DatabaseValue::Real64(v) if (v - 8.0).abs() < f64::EPSILON));
    }

    #[test]
    fn combined_template_has_both_predicates() {
        let filter = SelectionFilter::new(day())
            .with_bbox(zone())
            .with_mmsis([Mmsi::new(7)]);
        let plan = Retrieval::plan(&filter).unwrap();
        let (sql, params) = report_query(&plan);

        assert!(sql.contains("long BETWEEN $5 AND $6 AND mmsi IN ($7)"));
        assert_eq!(params.len(), 7);
    }

    #[test]
    fn two_phase_template_restricts_second_window_only_by_vessel() {
        let second = TimeRange::new(day().end, day().end + Duration::days(1));
        let filter = SelectionFilter::new(day())
            .with_bbox(zone())
            .with_trajectory_range(second);
        let plan = Retrieval::plan(&filter).unwrap();
        let (sql, params) = report_query(&plan);

        assert!(sql.starts_with("WITH zone_vessels AS (SELECT DISTINCT mmsi"));
        assert!(sql.contains(
            "WHERE mmsi IN (SELECT mmsi FROM zone_vessels) AND timestamp >= $7 AND timestamp <= $8"
        ));
        assert_eq!(params.len(), 8);

        let outer = sql.split(") SELECT").nth(1).unwrap();
        assert!(!outer.contains("lat BETWEEN"));
    }

    #[test]
    fn destination_template_limits_per_vessel() {
        let mmsis: BTreeSet<Mmsi> = [Mmsi::new(1), Mmsi::new(2), Mmsi::new(3)].into();
        let (sql, params) = destination_query(&day(), &mmsis);

        assert!(sql.contains("PARTITION BY mmsi ORDER BY timestamp DESC"));
        assert!(sql.contains("mmsi IN ($1, $2, $3)"));
        assert!(sql.contains("rn <= $6"));
        assert_eq!(params.len(), 6);
    }

    fn noon() -> NaiveDateTime {
        day().start.naive_utc() + Duration::hours(12)
    }

    #[test]
    fn report_columns_decode_into_report() {
        let report =
            report_from_columns(227_000_001, 43.5, 7.25, Some(90.0), None, noon()).unwrap();

        assert_eq!(report.mmsi, Mmsi::new(227_000_001));
        assert!((report.latitude - 43.5).abs() < f64::EPSILON);
        assert!((report.longitude - 7.25).abs() < f64::EPSILON);
        assert_eq!(report.sog, None);
        assert_eq!(report.timestamp, day().start + Duration::hours(12));
    }

    #[test]
    fn report_with_invalid_mmsi_fails_to_decode() {
        for raw in [-1, 1_000_000_000, i64::MAX] {
            let result = report_from_columns(raw, 43.5, 7.25, None, None, noon());
            assert!(
                matches!(result, Err(DbError::Conversion { .. })),
                "mmsi {raw}"
            );
        }
    }

    #[test]
    fn report_with_non_finite_position_fails_to_decode() {
        let bad_lat = report_from_columns(227_000_001, f64::NAN, 7.25, None, None, noon());
        let bad_long = report_from_columns(227_000_001, 43.5, f64::INFINITY, None, None, noon());

        assert!(matches!(bad_lat, Err(DbError::Conversion { message }) if message.contains("lat")));
        assert!(matches!(bad_long, Err(DbError::Conversion { message }) if message.contains("long")));
    }

    #[test]
    fn column_decode_failure_names_the_column() {
        let error = "north".parse::<f64>().map_err(conversion("lat")).unwrap_err();

        assert!(
            matches!(&error, DbError::Conversion { message } if message.contains("column lat")),
            "{error:?}"
        );
    }
}
