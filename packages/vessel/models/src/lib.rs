#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Vessel identity, position report and static attribute types.
//!
//! These are the shapes shared by every stage of the map engine: raw AIS
//! position reports as retrieved from the store, the static attributes
//! (hull offsets, draft, declared type) looked up per vessel, and the
//! enriched rows produced by joining the two.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Declared type used when a vessel has no type on record.
pub const UNKNOWN_SHIP_TYPE: &str = "Unknown";

/// Collapsed label for declared types that are too rare to chart.
pub const OTHER_SHIP_TYPE: &str = "Other";

/// A Maritime Mobile Service Identity: the nine-digit vessel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mmsi(u32);

impl Mmsi {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Mmsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

impl std::str::FromStr for Mmsi {
    type Err = MmsiListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 9 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MmsiListError::Malformed {
                input: s.to_string(),
            });
        }

        s.parse::<u32>()
            .map(Self)
            .map_err(|_| MmsiListError::Malformed {
                input: s.to_string(),
            })
    }
}

/// Error returned when a user-supplied identifier list is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MmsiListError {
    /// The list (or one of its elements) is not a sequence of nine-digit
    /// identifiers separated by commas or whitespace.
    #[error(
        "Invalid MMSI list '{input}': expected nine-digit identifiers separated by commas or spaces"
    )]
    Malformed {
        /// The offending input after separator normalization.
        input: String,
    },
}

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").unwrap_or_else(|_| unreachable!()));

static MMSI_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{9})(,\d{9})*$").unwrap_or_else(|_| unreachable!()));

/// Parses a free-text identifier list such as
/// `"123456789,987654321 352009000"`.
///
/// Any run of commas and whitespace separates two identifiers and trailing
/// separators are ignored. An empty (or whitespace-only) input yields an
/// empty set, meaning "no identifier filter".
///
/// # Errors
///
/// Returns [`MmsiListError::Malformed`] if any element is not exactly nine
/// digits.
pub fn parse_mmsi_list(input: &str) -> Result<BTreeSet<Mmsi>, MmsiListError> {
    let cleaned = SEPARATORS.replace_all(input.trim(), ",");
    let cleaned = cleaned.trim_end_matches(',');

    if cleaned.is_empty() {
        return Ok(BTreeSet::new());
    }

    if !MMSI_LIST.is_match(cleaned) {
        return Err(MmsiListError::Malformed {
            input: cleaned.to_string(),
        });
    }

    cleaned.split(',').map(str::parse).collect()
}

/// One timestamped AIS position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Reporting vessel.
    pub mmsi: Mmsi,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Course over ground in degrees, 0 = north, clockwise.
    pub cog: Option<f64>,
    /// Speed over ground in knots.
    pub sog: Option<f64>,
    /// When the report was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Distances from the GPS reference point to the hull extremities, in
/// metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HullOffsets {
    /// Reference point to bow (AIS dimension A).
    pub bow: Option<f64>,
    /// Reference point to stern (AIS dimension B).
    pub stern: Option<f64>,
    /// Reference point to port side (AIS dimension C).
    pub port: Option<f64>,
    /// Reference point to starboard side (AIS dimension D).
    pub starboard: Option<f64>,
    /// Overall length summed from the raw bow and stern values.
    pub length: Option<f64>,
    /// Overall beam summed from the raw port and starboard values.
    pub width: Option<f64>,
}

impl HullOffsets {
    /// Builds offsets from raw stored values.
    ///
    /// A stored `0` means "not available" in AIS static data and is kept
    /// as missing. Length and beam are summed before that replacement, so
    /// a bow of 50 with a stern of 0 is 50 long; a zero sum is missing.
    #[must_use]
    pub fn from_raw(
        bow: Option<f64>,
        stern: Option<f64>,
        port: Option<f64>,
        starboard: Option<f64>,
    ) -> Self {
        Self {
            bow: available(bow),
            stern: available(stern),
            port: available(port),
            starboard: available(starboard),
            length: available(bow.zip(stern).map(|(a, b)| a + b)),
            width: available(port.zip(starboard).map(|(c, d)| c + d)),
        }
    }

    /// Returns `[bow, stern, port, starboard]` when all four are known.
    #[must_use]
    pub const fn complete(&self) -> Option<[f64; 4]> {
        match (self.bow, self.stern, self.port, self.starboard) {
            (Some(bow), Some(stern), Some(port), Some(starboard)) => {
                Some([bow, stern, port, starboard])
            }
            _ => None,
        }
    }

    /// Overall length (bow + stern).
    #[must_use]
    pub const fn length(&self) -> Option<f64> {
        self.length
    }

    /// Overall beam (port + starboard).
    #[must_use]
    pub const fn width(&self) -> Option<f64> {
        self.width
    }

    /// Length × width, used as a rough size parameter.
    #[must_use]
    pub fn size(&self) -> Option<f64> {
        Some(self.length()? * self.width()?)
    }
}

/// Treats zero and non-finite values as "not available".
#[must_use]
pub fn available(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Static attributes of one vessel, one record per identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselAttributes {
    /// Vessel identifier.
    pub mmsi: Mmsi,
    /// Declared type as recorded ("Unknown" when absent).
    pub ship_type: String,
    /// Numeric type code, when recorded.
    pub ship_type_id: Option<i32>,
    /// Declared type collapsed for charting (rare types become "Other").
    pub chart_type: String,
    /// Hull offsets.
    pub offsets: HullOffsets,
    /// Draft in metres.
    pub draft: Option<f64>,
}

impl VesselAttributes {
    /// Overall length in metres.
    #[must_use]
    pub fn length(&self) -> Option<f64> {
        self.offsets.length()
    }

    /// Overall beam in metres.
    #[must_use]
    pub fn width(&self) -> Option<f64> {
        self.offsets.width()
    }

    /// Length × width.
    #[must_use]
    pub fn size(&self) -> Option<f64> {
        self.offsets.size()
    }
}

/// A report left-joined with the static attributes of its vessel.
///
/// The attribute fields are empty when the vessel has no static record;
/// both type fields then read "Unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedReport {
    /// The position report.
    #[serde(flatten)]
    pub report: Report,
    /// Declared type for display.
    pub ship_type: String,
    /// Collapsed type for charts and legends.
    pub chart_type: String,
    /// Numeric type code.
    pub ship_type_id: Option<i32>,
    /// Hull offsets.
    pub offsets: HullOffsets,
    /// Draft in metres.
    pub draft: Option<f64>,
}

impl EnrichedReport {
    /// Joins a report with the (optional) attributes of its vessel.
    #[must_use]
    pub fn join(report: Report, attributes: Option<&VesselAttributes>) -> Self {
        match attributes {
            Some(attrs) => Self {
                report,
                ship_type: attrs.ship_type.clone(),
                chart_type: attrs.chart_type.clone(),
                ship_type_id: attrs.ship_type_id,
                offsets: attrs.offsets,
                draft: attrs.draft,
            },
            None => Self {
                report,
                ship_type: UNKNOWN_SHIP_TYPE.to_string(),
                chart_type: UNKNOWN_SHIP_TYPE.to_string(),
                ship_type_id: None,
                offsets: HullOffsets::default(),
                draft: None,
            },
        }
    }

    /// Returns the value of a numeric attribute for this row.
    #[must_use]
    pub fn numeric(&self, attribute: NumericAttribute) -> Option<f64> {
        match attribute {
            NumericAttribute::Sog => self.report.sog,
            NumericAttribute::Cog => self.report.cog,
            NumericAttribute::Draft => self.draft,
            NumericAttribute::Length => self.offsets.length(),
            NumericAttribute::Width => self.offsets.width(),
        }
    }
}

/// Numeric per-row attributes that can drive a continuous color ramp.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NumericAttribute {
    /// Speed over ground (knots).
    Sog,
    /// Course over ground (degrees).
    Cog,
    /// Draft (metres).
    Draft,
    /// Overall length (metres).
    Length,
    /// Overall beam (metres).
    Width,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_separators() {
        let list = parse_mmsi_list(" 123456789,987654321  352009000, ").unwrap();
        let values: Vec<u32> = list.iter().map(|m| m.value()).collect();
        assert_eq!(values, vec![123_456_789, 352_009_000, 987_654_321]);
    }

    #[test]
    fn empty_list_means_no_filter() {
        assert!(parse_mmsi_list("   ").unwrap().is_empty());
        assert!(parse_mmsi_list("").unwrap().is_empty());
    }

    #[test]
    fn rejects_short_and_alphabetic_identifiers() {
        assert!(parse_mmsi_list("12345678").is_err());
        assert!(parse_mmsi_list("123456789,98765432a").is_err());
        assert!(parse_mmsi_list("1234567890").is_err());
        assert!(parse_mmsi_list(",123456789").is_err());
    }

    #[test]
    fn mmsi_display_is_zero_padded() {
        assert_eq!(Mmsi::new(2_345_678).to_string(), "002345678");
        assert_eq!("002345678".parse::<Mmsi>().unwrap(), Mmsi::new(2_345_678));
    }

    #[test]
    fn zero_offsets_are_missing() {
        let offsets = HullOffsets::from_raw(Some(100.0), Some(0.0), Some(10.0), Some(12.0));
        assert_eq!(offsets.stern, None);
        assert_eq!(offsets.complete(), None);
        assert!((offsets.width().unwrap() - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_sum_raw_values_before_zeros_go_missing() {
        let offsets = HullOffsets::from_raw(Some(50.0), Some(0.0), Some(0.0), Some(0.0));
        assert_eq!(offsets.length(), Some(50.0));
        assert_eq!(offsets.width(), None);
        assert_eq!(offsets.size(), None);

        let offsets = HullOffsets::from_raw(Some(50.0), None, Some(4.0), Some(6.0));
        assert_eq!(offsets.length(), None);
        assert_eq!(offsets.width(), Some(10.0));
    }

    #[test]
    fn derived_dimensions() {
        let offsets = HullOffsets::from_raw(Some(80.0), Some(20.0), Some(6.0), Some(9.0));
        assert!((offsets.length().unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((offsets.width().unwrap() - 15.0).abs() < f64::EPSILON);
        assert!((offsets.size().unwrap() - 1500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn join_without_attributes_defaults_types() {
        let report = Report {
            mmsi: Mmsi::new(227_000_001),
            latitude: 43.7,
            longitude: 7.3,
            cog: None,
            sog: Some(3.2),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        };
        let row = EnrichedReport::join(report, None);
        assert_eq!(row.ship_type, UNKNOWN_SHIP_TYPE);
        assert_eq!(row.chart_type, UNKNOWN_SHIP_TYPE);
        assert_eq!(row.numeric(NumericAttribute::Draft), None);
        assert_eq!(row.numeric(NumericAttribute::Sog), Some(3.2));
    }

    #[test]
    fn numeric_attribute_round_trips_through_strum() {
        assert_eq!("draft".parse::<NumericAttribute>().unwrap(), NumericAttribute::Draft);
        assert_eq!("SOG".parse::<NumericAttribute>().unwrap(), NumericAttribute::Sog);
        assert_eq!(NumericAttribute::Length.as_ref(), "length");
    }

    #[test]
    fn enriched_report_flattens_report_fields() {
        let report = Report {
            mmsi: Mmsi::new(227_000_001),
            latitude: 43.7,
            longitude: 7.3,
            cog: Some(90.0),
            sog: None,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        };
        let json = serde_json::to_value(EnrichedReport::join(report, None)).unwrap();
        assert_eq!(json["mmsi"], 227_000_001);
        assert_eq!(json["shipType"], "Unknown");
    }
}
