//! Geographic and screen-space value types.
//!
//! `GeoPoint` is the WGS84 coordinate passed between the geocoder, the map
//! camera, and the tract index. `PixelPoint` is a screen coordinate reported
//! by pointer events or produced by projecting a `GeoPoint`. `TractGeometry`
//! carries the polygon rings of a tract exactly as the tile query returned
//! them so the highlight source can be rewritten without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Validation errors returned when constructing a [`GeoPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoPointValidationError {
    /// Latitude or longitude is NaN or infinite.
    #[error("coordinates must be finite (lat={lat}, lon={lon})")]
    NonFinite {
        /// Rejected latitude.
        lat: f64,
        /// Rejected longitude.
        lon: f64,
    },
    /// Latitude is outside `[-90, 90]`.
    #[error("latitude {0} must be within [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude is outside `[-180, 180]`.
    #[error("longitude {0} must be within [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Immutable WGS84 coordinate.
///
/// ## Invariants
/// - both components are finite;
/// - `lat` lies in `[-90, 90]` and `lon` in `[-180, 180]`.
///
/// # Examples
/// ```
/// use opportunity_map::domain::GeoPoint;
///
/// let point = GeoPoint::new(40.7128, -74.006).expect("valid point");
/// assert_eq!(point.to_lng_lat(), [-74.006, 40.7128]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoPointDto", into = "GeoPointDto")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct GeoPointDto {
    lat: f64,
    lon: f64,
}

impl TryFrom<GeoPointDto> for GeoPoint {
    type Error = GeoPointValidationError;

    fn try_from(value: GeoPointDto) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lon)
    }
}

impl From<GeoPoint> for GeoPointDto {
    fn from(value: GeoPoint) -> Self {
        Self {
            lat: value.lat,
            lon: value.lon,
        }
    }
}

impl GeoPoint {
    /// Validate and build a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeoPointValidationError`] when either component is not
    /// finite or lies outside the WGS84 range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoPointValidationError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(GeoPointValidationError::NonFinite { lat, lon });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoPointValidationError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GeoPointValidationError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in degrees.
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// Coordinate in the `[lng, lat]` order used by GeoJSON and the map engine.
    pub const fn to_lng_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// GeoJSON `Feature` wrapping this coordinate as a `Point`.
    pub fn to_point_feature(&self) -> Value {
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": self.to_lng_lat() },
            "properties": {}
        })
    }
}

/// Screen-space coordinate in CSS pixels relative to the map canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal offset from the left edge.
    pub x: f64,
    /// Vertical offset from the top edge.
    pub y: f64,
}

impl PixelPoint {
    /// Build a pixel coordinate.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Linear ring of a polygon, first and last positions equal when closed.
pub type Ring = Vec<GeoPoint>;

/// Errors raised while decoding a GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryDecodeError {
    /// The geometry `type` is missing or not a polygonal type.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),
    /// The `coordinates` member has the wrong shape.
    #[error("malformed coordinates: {0}")]
    MalformedCoordinates(String),
    /// A position failed coordinate validation.
    #[error(transparent)]
    InvalidPosition(#[from] GeoPointValidationError),
}

/// Polygonal geometry of a census tract.
///
/// Tiles deliver tracts as either `Polygon` or `MultiPolygon`; both are kept
/// verbatim so the highlight source renders the same outline the fill layer
/// shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TractGeometry {
    /// Single polygon: outer ring followed by holes.
    Polygon(Vec<Ring>),
    /// Several polygons belonging to one tract.
    MultiPolygon(Vec<Vec<Ring>>),
}

impl TractGeometry {
    /// Geometry with no rings, used to blank the highlight source.
    pub const fn empty() -> Self {
        Self::Polygon(Vec::new())
    }

    /// Whether the geometry holds no positions at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Polygon(rings) => rings.iter().all(Vec::is_empty),
            Self::MultiPolygon(polygons) => polygons.iter().flatten().all(Vec::is_empty),
        }
    }

    /// Decode a GeoJSON geometry object.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryDecodeError`] for non-polygonal geometries, badly
    /// shaped coordinate arrays, or out-of-range positions.
    pub fn from_geojson(geometry: &Value) -> Result<Self, GeometryDecodeError> {
        let kind = geometry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let coordinates = geometry.get("coordinates").ok_or_else(|| {
            GeometryDecodeError::MalformedCoordinates("missing coordinates".to_owned())
        })?;
        match kind {
            "Polygon" => decode_polygon(coordinates).map(Self::Polygon),
            "MultiPolygon" => as_array(coordinates, "multipolygon")?
                .iter()
                .map(decode_polygon)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::MultiPolygon),
            other => Err(GeometryDecodeError::UnsupportedType(other.to_owned())),
        }
    }

    /// Encode as a GeoJSON geometry object.
    pub fn to_geojson(&self) -> Value {
        match self {
            Self::Polygon(rings) => json!({
                "type": "Polygon",
                "coordinates": encode_polygon(rings),
            }),
            Self::MultiPolygon(polygons) => json!({
                "type": "MultiPolygon",
                "coordinates": polygons.iter().map(|rings| encode_polygon(rings)).collect::<Vec<_>>(),
            }),
        }
    }

    /// Encode as a GeoJSON `Feature` with empty properties.
    ///
    /// This is the payload written into the highlight source.
    pub fn to_feature(&self) -> Value {
        json!({
            "type": "Feature",
            "geometry": self.to_geojson(),
            "properties": {}
        })
    }
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, GeometryDecodeError> {
    value
        .as_array()
        .ok_or_else(|| GeometryDecodeError::MalformedCoordinates(format!("{what} is not an array")))
}

fn decode_polygon(value: &Value) -> Result<Vec<Ring>, GeometryDecodeError> {
    as_array(value, "polygon")?
        .iter()
        .map(|ring| {
            as_array(ring, "ring")?
                .iter()
                .map(decode_position)
                .collect::<Result<Ring, _>>()
        })
        .collect()
}

fn decode_position(value: &Value) -> Result<GeoPoint, GeometryDecodeError> {
    match as_array(value, "position")?.as_slice() {
        [lon, lat, ..] => {
            let (Some(lon), Some(lat)) = (lon.as_f64(), lat.as_f64()) else {
                return Err(GeometryDecodeError::MalformedCoordinates(
                    "position components must be numbers".to_owned(),
                ));
            };
            Ok(GeoPoint::new(lat, lon)?)
        }
        _ => Err(GeometryDecodeError::MalformedCoordinates(
            "position needs at least two components".to_owned(),
        )),
    }
}

fn encode_polygon(rings: &[Ring]) -> Vec<Vec<[f64; 2]>> {
    rings
        .iter()
        .map(|ring| ring.iter().map(GeoPoint::to_lng_lat).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    //! Coordinate validation and GeoJSON geometry coverage.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn rejects_non_finite_coordinates(#[case] lat: f64, #[case] lon: f64) {
        let err = GeoPoint::new(lat, lon).expect_err("non-finite must fail");
        assert!(matches!(err, GeoPointValidationError::NonFinite { .. }));
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(-91.0, 0.0)]
    fn rejects_latitude_out_of_range(#[case] lat: f64, #[case] lon: f64) {
        let err = GeoPoint::new(lat, lon).expect_err("latitude must fail");
        assert_eq!(err, GeoPointValidationError::LatitudeOutOfRange(lat));
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        let err = GeoPoint::new(10.0, 181.0).expect_err("longitude must fail");
        assert_eq!(err, GeoPointValidationError::LongitudeOutOfRange(181.0));
    }

    #[test]
    fn deserialisation_validates_ranges() {
        let parsed: Result<GeoPoint, _> = serde_json::from_value(json!({ "lat": 95.0, "lon": 0.0 }));
        assert!(parsed.is_err(), "out of range latitude must not deserialise");
    }

    #[test]
    fn decodes_polygon_in_lng_lat_order() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[-74.0, 40.0], [-73.9, 40.0], [-73.9, 40.1], [-74.0, 40.0]]]
        });
        let decoded = TractGeometry::from_geojson(&geometry).expect("polygon decodes");
        let TractGeometry::Polygon(rings) = &decoded else {
            panic!("expected polygon, got {decoded:?}");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0][0].lat(), 40.0);
        assert_eq!(rings[0][0].lon(), -74.0);
        assert_eq!(decoded.to_geojson(), geometry);
    }

    #[test]
    fn decodes_multipolygon() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[-74.0, 40.0], [-73.9, 40.0], [-74.0, 40.0]]],
                [[[-73.0, 41.0], [-72.9, 41.0], [-73.0, 41.0]]]
            ]
        });
        let decoded = TractGeometry::from_geojson(&geometry).expect("multipolygon decodes");
        assert!(matches!(decoded, TractGeometry::MultiPolygon(ref polygons) if polygons.len() == 2));
    }

    #[rstest]
    #[case(json!({ "type": "Point", "coordinates": [0.0, 0.0] }))]
    #[case(json!({ "type": "Polygon" }))]
    #[case(json!({ "type": "Polygon", "coordinates": [[["a", 1.0]]] }))]
    #[case(json!({ "type": "Polygon", "coordinates": [[[0.0]]] }))]
    fn rejects_malformed_geometries(#[case] geometry: Value) {
        assert!(TractGeometry::from_geojson(&geometry).is_err());
    }

    #[test]
    fn empty_geometry_encodes_blank_polygon_feature() {
        let feature = TractGeometry::empty().to_feature();
        assert_eq!(feature["geometry"]["type"], "Polygon");
        assert_eq!(feature["geometry"]["coordinates"], json!([]));
        assert!(TractGeometry::empty().is_empty());
    }
}
