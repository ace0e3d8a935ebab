//! Oriented vessel footprints.
//!
//! Hull outlines are built in Web Mercator (EPSG:3857) metres around the
//! origin, rotated to the course over ground, moved onto the vessel's
//! projected position and projected back to WGS84. Distances near the
//! vessel are not corrected for the Mercator scale factor.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use ais_map_vessel_models::EnrichedReport;
use geo::{Coord, LineString, MapCoords as _, Point, Polygon, Rotate as _, Translate as _, coord};
use serde::{Deserialize, Serialize};

/// Semi-major axis of WGS84, the sphere radius of Web Mercator.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Index of the arrow tip among the footprint's exterior vertices.
pub const TIP_VERTEX: usize = 3;

/// Number of segments approximating a size disc.
pub const DISC_SEGMENTS: u32 = 64;

/// Calibration factors of the footprint shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootprintConfig {
    /// Applied to bow and stern offsets.
    pub length_factor: f64,
    /// Extra growth applied to bow and stern offsets.
    pub length_scale: f64,
    /// Applied to port and starboard offsets.
    pub width_factor: f64,
    /// Arrow tip length as a fraction of the scaled hull length.
    pub arrow_factor: f64,
    /// Disc radius when the hull length is unknown, in metres.
    pub default_disc_radius_m: f64,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            length_factor: 0.8,
            length_scale: 1.3,
            width_factor: 1.0,
            arrow_factor: 0.2,
            default_disc_radius_m: 5.0,
        }
    }
}

/// Projects `(longitude, latitude)` degrees to Web Mercator metres.
#[must_use]
pub fn to_mercator(longitude: f64, latitude: f64) -> Coord<f64> {
    coord! {
        x: EARTH_RADIUS_M * longitude.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + latitude.to_radians() / 2.0).tan().ln(),
    }
}

/// Projects Web Mercator metres back to `(longitude, latitude)` degrees.
#[must_use]
pub fn from_mercator(c: Coord<f64>) -> Coord<f64> {
    coord! {
        x: (c.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0f64.mul_add((c.y / EARTH_RADIUS_M).exp().atan(), -FRAC_PI_2)).to_degrees(),
    }
}

fn position(row: &EnrichedReport) -> Option<Coord<f64>> {
    let (lon, lat) = (row.report.longitude, row.report.latitude);
    (lon.is_finite() && lat.is_finite()).then(|| to_mercator(lon, lat))
}

/// Builds the arrow-tipped hull outline of a report.
///
/// Returns `None` when any hull offset or the position is missing. A
/// missing course is drawn pointing north. The exterior has the five
/// hull vertices (stern-port, stern-starboard, bow-starboard, tip,
/// bow-port) followed by the closing vertex.
#[must_use]
pub fn synthesize(row: &EnrichedReport, config: &FootprintConfig) -> Option<Polygon<f64>> {
    let [bow, stern, port, starboard] = row.offsets.complete()?;
    let center = position(row)?;

    let bow = bow * config.length_factor * config.length_scale;
    let stern = stern * config.length_factor * config.length_scale;
    let port = port * config.width_factor;
    let starboard = starboard * config.width_factor;

    let hull = Polygon::new(
        LineString::from(vec![
            (-port, -stern),
            (starboard, -stern),
            (starboard, bow),
            (
                (starboard - port) / 2.0,
                (bow + stern).mul_add(config.arrow_factor, bow),
            ),
            (-port, bow),
        ]),
        vec![],
    );

    // Compass course is clockwise; geo rotates counter-clockwise.
    let cog = row.report.cog.filter(|c| c.is_finite()).unwrap_or(0.0);
    let placed = hull
        .rotate_around_point(-cog, Point::new(0.0, 0.0))
        .translate(center.x, center.y);

    Some(placed.map_coords(from_mercator))
}

/// Builds a disc of radius half the hull length around a report.
///
/// Falls back to [`FootprintConfig::default_disc_radius_m`] when the
/// length is unknown. Returns `None` when the position is missing.
#[must_use]
pub fn synthesize_disc(row: &EnrichedReport, config: &FootprintConfig) -> Option<Polygon<f64>> {
    let center = position(row)?;
    let radius = row
        .offsets
        .length()
        .map_or(config.default_disc_radius_m, |length| length / 2.0);

    let ring: Vec<Coord<f64>> = (0..DISC_SEGMENTS)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(DISC_SEGMENTS);
            from_mercator(coord! {
                x: radius.mul_add(angle.cos(), center.x),
                y: radius.mul_add(angle.sin(), center.y),
            })
        })
        .collect();

    Some(Polygon::new(LineString::from(ring), vec![]))
}
