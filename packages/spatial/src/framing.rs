//! Map framing: center, extent and canvas size.
//!
//! The canvas keeps the true ground aspect ratio of the extent: both spans
//! are measured as great-circle distances, so longitude compression at high
//! latitudes is accounted for.

use ais_map_database_models::BoundingBox;
use ais_map_vessel_models::EnrichedReport;
use geo::{Polygon, Rect, coord};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use crate::LatLon;
use crate::distance::haversine_m;

/// Default maximum canvas width in pixels.
pub const DEFAULT_MAX_WIDTH: f64 = 1200.0;

/// Errors building an [`Extent`].
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The drawn shape had no usable coordinates.
    #[error("Drawn shape has no coordinates")]
    EmptyRing,

    /// The drawn shape was not a `GeoJSON` polygon.
    #[error("Drawn shape is not a GeoJSON polygon: {message}")]
    InvalidGeoJson {
        /// Description of what went wrong.
        message: String,
    },
}

/// Framing settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Canvas width in pixels; the height follows from the aspect ratio.
    pub max_width: f64,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

/// A south-west / north-east envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extent {
    /// Minimum latitude and longitude.
    pub south_west: LatLon,
    /// Maximum latitude and longitude.
    pub north_east: LatLon,
}

impl Extent {
    /// The extent of a bounding box.
    #[must_use]
    pub const fn from_bbox(bbox: &BoundingBox) -> Self {
        Self {
            south_west: LatLon::new(bbox.south, bbox.west),
            north_east: LatLon::new(bbox.north, bbox.east),
        }
    }

    /// The extent as a bounding box.
    #[must_use]
    pub const fn to_bbox(&self) -> BoundingBox {
        BoundingBox::new(
            self.south_west.longitude,
            self.south_west.latitude,
            self.north_east.longitude,
            self.north_east.latitude,
        )
    }

    /// Min/max envelope of a drawn ring of `(longitude, latitude)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::EmptyRing`] if the ring has no finite
    /// coordinates.
    pub fn from_ring(ring: &[(f64, f64)]) -> Result<Self, FramingError> {
        Self::envelope(ring.iter().map(|&(lon, lat)| LatLon::new(lat, lon)))
            .ok_or(FramingError::EmptyRing)
    }

    /// Envelope of a drawn `GeoJSON` polygon (bare geometry or feature).
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::InvalidGeoJson`] if the input is not a
    /// polygon and [`FramingError::EmptyRing`] if its ring is empty.
    pub fn from_geojson(input: &str) -> Result<Self, FramingError> {
        let invalid = |message: String| FramingError::InvalidGeoJson { message };

        let geometry = match input.parse::<GeoJson>().map_err(|e| invalid(e.to_string()))? {
            GeoJson::Geometry(geometry) => geometry,
            GeoJson::Feature(feature) => feature
                .geometry
                .ok_or_else(|| invalid("feature has no geometry".to_string()))?,
            GeoJson::FeatureCollection(_) => {
                return Err(invalid("expected a single polygon".to_string()));
            }
        };

        let polygon: Polygon<f64> = geometry
            .try_into()
            .map_err(|e: geojson::Error| invalid(e.to_string()))?;
        let ring: Vec<(f64, f64)> = polygon.exterior().coords().map(|c| (c.x, c.y)).collect();

        Self::from_ring(&ring)
    }

    /// Min/max envelope of a set of positions, ignoring non-finite ones.
    #[must_use]
    pub fn envelope(points: impl IntoIterator<Item = LatLon>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.latitude.is_finite() && p.longitude.is_finite())
            .fold(None, |acc: Option<Self>, p| {
                Some(acc.map_or(
                    Self {
                        south_west: p,
                        north_east: p,
                    },
                    |e| Self {
                        south_west: LatLon::new(
                            e.south_west.latitude.min(p.latitude),
                            e.south_west.longitude.min(p.longitude),
                        ),
                        north_east: LatLon::new(
                            e.north_east.latitude.max(p.latitude),
                            e.north_east.longitude.max(p.longitude),
                        ),
                    },
                ))
            })
    }

    /// Planar mean of the corners.
    ///
    /// Not the geodesic midpoint; close enough for the small extents a
    /// user draws on a map.
    #[must_use]
    pub fn midpoint(&self) -> LatLon {
        LatLon::new(
            f64::midpoint(self.south_west.latitude, self.north_east.latitude),
            f64::midpoint(self.south_west.longitude, self.north_east.longitude),
        )
    }

    /// Four rectangles (south, east, north, west bands) covering the whole
    /// world outside the extent, for dimming everything but the zone.
    #[must_use]
    pub fn outside_mask(&self) -> [Polygon<f64>; 4] {
        let sw = self.south_west;
        let ne = self.north_east;
        let band = |min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64| {
            Rect::new(
                coord! { x: min_lon, y: min_lat },
                coord! { x: max_lon, y: max_lat },
            )
            .to_polygon()
        };

        [
            band(-180.0, -90.0, 180.0, sw.latitude),
            band(ne.longitude, sw.latitude, 180.0, ne.latitude),
            band(-180.0, ne.latitude, 180.0, 90.0),
            band(-180.0, sw.latitude, sw.longitude, ne.latitude),
        ]
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl CanvasSize {
    /// Height over width.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

/// Where the frame comes from.
#[derive(Debug, Clone, Copy)]
pub enum FrameSource<'a> {
    /// The rectangle the user drew.
    Drawn(Extent),
    /// The point cloud of an explicit vessel list.
    Points(&'a [EnrichedReport]),
}

impl<'a> FrameSource<'a> {
    /// Picks the source: the point cloud when the user supplied a vessel
    /// list, otherwise the drawn rectangle (if any).
    #[must_use]
    pub fn choose(
        drawn: Option<Extent>,
        rows: &'a [EnrichedReport],
        identifiers_provided: bool,
    ) -> Option<Self> {
        if identifiers_provided {
            Some(Self::Points(rows))
        } else {
            drawn.map(Self::Drawn)
        }
    }
}

/// A computed map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapFrame {
    /// Map center.
    pub center: LatLon,
    /// Visible extent.
    pub extent: Extent,
    /// Canvas size preserving the extent's ground aspect ratio.
    pub canvas: CanvasSize,
}

/// Computes center, extent and canvas size.
///
/// Returns `None` for a point cloud with no finite positions. A degenerate
/// extent (zero horizontal or vertical span) gets a square canvas.
#[must_use]
pub fn frame(source: FrameSource<'_>, config: &FramingConfig) -> Option<MapFrame> {
    let (center, extent) = match source {
        FrameSource::Drawn(extent) => (extent.midpoint(), extent),
        FrameSource::Points(rows) => {
            let points: Vec<LatLon> = rows
                .iter()
                .map(|r| LatLon::new(r.report.latitude, r.report.longitude))
                .filter(|p| p.latitude.is_finite() && p.longitude.is_finite())
                .collect();
            let extent = Extent::envelope(points.iter().copied())?;
            #[allow(clippy::cast_precision_loss)]
            let n = points.len() as f64;
            let center = LatLon::new(
                points.iter().map(|p| p.latitude).sum::<f64>() / n,
                points.iter().map(|p| p.longitude).sum::<f64>() / n,
            );
            (center, extent)
        }
    };

    let canvas = canvas_size(&extent, center, config.max_width);

    log::debug!(
        "Framed extent {:?} at {:?}: {:.0}x{:.0}",
        extent,
        center,
        canvas.width,
        canvas.height
    );

    Some(MapFrame {
        center,
        extent,
        canvas,
    })
}

fn canvas_size(extent: &Extent, center: LatLon, max_width: f64) -> CanvasSize {
    let v_span = haversine_m(
        LatLon::new(extent.south_west.latitude, center.longitude),
        LatLon::new(extent.north_east.latitude, center.longitude),
    );
    let h_span = haversine_m(
        LatLon::new(center.latitude, extent.south_west.longitude),
        LatLon::new(center.latitude, extent.north_east.longitude),
    );

    if h_span <= 0.0 || v_span <= 0.0 {
        return CanvasSize {
            width: max_width,
            height: max_width,
        };
    }

    CanvasSize {
        width: max_width,
        height: v_span * (max_width / h_span),
    }
}

#[cfg(test)]
mod tests {
    use ais_map_vessel_models::{Mmsi, Report};
    use chrono::{DateTime, Utc};

    use super::*;

    fn row(latitude: f64, longitude: f64) -> EnrichedReport {
        EnrichedReport::join(
            Report {
                mmsi: Mmsi::new(227_000_001),
                latitude,
                longitude,
                cog: None,
                sog: None,
                timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            },
            None,
        )
    }

    fn drawn(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Extent {
        Extent::from_bbox(&BoundingBox::from_bounds(min_lat, max_lat, min_lon, max_lon))
    }

    #[test]
    fn square_extent_at_equator_is_square() {
        let f = frame(
            FrameSource::Drawn(drawn(-0.5, 0.5, -0.5, 0.5)),
            &FramingConfig::default(),
        )
        .unwrap();
        assert!((f.canvas.aspect_ratio() - 1.0).abs() < 1e-3);
        assert!((f.canvas.width - DEFAULT_MAX_WIDTH).abs() < f64::EPSILON);
    }

    #[test]
    fn wide_extent_at_equator_is_half_as_tall() {
        let f = frame(
            FrameSource::Drawn(drawn(-0.5, 0.5, -1.0, 1.0)),
            &FramingConfig::default(),
        )
        .unwrap();
        assert!((f.canvas.aspect_ratio() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn high_latitude_compresses_width() {
        let f = frame(
            FrameSource::Drawn(drawn(59.5, 60.5, -0.5, 0.5)),
            &FramingConfig::default(),
        )
        .unwrap();
        assert!((f.canvas.aspect_ratio() - 2.0).abs() < 0.05);
    }

    #[test]
    fn drawn_center_is_planar_midpoint() {
        let f = frame(
            FrameSource::Drawn(drawn(43.0, 44.0, 7.0, 9.0)),
            &FramingConfig::default(),
        )
        .unwrap();
        assert_eq!(f.center, LatLon::new(43.5, 8.0));
    }

    #[test]
    fn point_cloud_uses_mean_and_envelope() {
        let rows = vec![row(43.0, 7.0), row(44.0, 8.0), row(43.0, 9.0)];
        let f = frame(FrameSource::Points(&rows), &FramingConfig::default()).unwrap();
        assert!((f.center.latitude - 43.333_333).abs() < 1e-5);
        assert!((f.center.longitude - 8.0).abs() < 1e-9);
        assert_eq!(f.extent, drawn(43.0, 44.0, 7.0, 9.0));
    }

    #[test]
    fn empty_point_cloud_has_no_frame() {
        assert!(frame(FrameSource::Points(&[]), &FramingConfig::default()).is_none());
    }

    #[test]
    fn single_point_gets_square_canvas() {
        let rows = vec![row(43.0, 7.0)];
        let f = frame(FrameSource::Points(&rows), &FramingConfig { max_width: 800.0 }).unwrap();
        assert!((f.canvas.width - 800.0).abs() < f64::EPSILON);
        assert!((f.canvas.height - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn choose_prefers_points_in_list_mode() {
        let rows = vec![row(43.0, 7.0)];
        let extent = drawn(0.0, 1.0, 0.0, 1.0);
        assert!(matches!(
            FrameSource::choose(Some(extent), &rows, true),
            Some(FrameSource::Points(_))
        ));
        assert!(matches!(
            FrameSource::choose(Some(extent), &rows, false),
            Some(FrameSource::Drawn(_))
        ));
        assert!(FrameSource::choose(None, &rows, false).is_none());
    }

    #[test]
    fn ring_envelope_and_empty_ring() {
        let ring = [(7.0, 43.0), (8.0, 43.0), (8.0, 44.0), (7.0, 44.0), (7.0, 43.0)];
        assert_eq!(Extent::from_ring(&ring).unwrap(), drawn(43.0, 44.0, 7.0, 8.0));
        assert!(matches!(Extent::from_ring(&[]), Err(FramingError::EmptyRing)));
    }

    #[test]
    fn geojson_drawn_polygon() {
        let feature = r#"{"type":"Feature","properties":{},"geometry":{"type":"Polygon",
            "coordinates":[[[7.0,43.0],[8.0,43.0],[8.0,44.0],[7.0,44.0],[7.0,43.0]]]}}"#;
        assert_eq!(Extent::from_geojson(feature).unwrap(), drawn(43.0, 44.0, 7.0, 8.0));

        let point = r#"{"type":"Point","coordinates":[7.0,43.0]}"#;
        assert!(matches!(
            Extent::from_geojson(point),
            Err(FramingError::InvalidGeoJson { .. })
        ));
    }

    #[test]
    fn outside_mask_leaves_the_extent_uncovered() {
        use geo::Contains as _;

        let extent = drawn(43.0, 44.0, 7.0, 8.0);
        let mask = extent.outside_mask();
        let inside = geo::Point::new(7.5, 43.5);
        let outside = [
            geo::Point::new(7.5, 10.0),
            geo::Point::new(100.0, 43.5),
            geo::Point::new(7.5, 60.0),
            geo::Point::new(-20.0, 43.5),
        ];

        assert!(mask.iter().all(|band| !band.contains(&inside)));
        for (band, point) in mask.iter().zip(outside) {
            assert!(band.contains(&point));
        }
    }
}
