//! Builders for tract fixtures.

use serde_json::{Map, Value, json};

use crate::domain::ports::RenderedFeature;
use crate::domain::{GeoPoint, TractFeature, TractGeometry, TractId};

/// Default choropleth layer id.
pub const TRACT_LAYER: &str = "census-tracts-layer";

/// Closed square ring whose south-west corner sits `offset` degrees
/// north-east of (40, -74). Distinct offsets give distinct geometries.
///
/// # Panics
///
/// Panics if `offset` pushes the square outside WGS84 ranges.
pub fn square_geometry(offset: f64) -> TractGeometry {
    let point = |lat: f64, lon: f64| match GeoPoint::new(lat, lon) {
        Ok(point) => point,
        Err(error) => panic!("square corner out of range: {error}"),
    };
    let (south, west) = (40.0 + offset, -74.0 + offset);
    TractGeometry::Polygon(vec![vec![
        point(south, west),
        point(south, west + 0.01),
        point(south + 0.01, west + 0.01),
        point(south + 0.01, west),
        point(south, west),
    ]])
}

/// Domain tract with a square geometry.
///
/// # Panics
///
/// Panics on a blank id.
pub fn tract_feature(id: &str, raw_attribute: f64, offset: f64) -> TractFeature {
    let id = match TractId::new(id) {
        Ok(id) => id,
        Err(error) => panic!("invalid tract id: {error}"),
    };
    TractFeature::new(id, raw_attribute, square_geometry(offset))
}

/// Engine feature on `layer` carrying `GEOID`, the income attribute, and
/// the geometry of `tract_feature(id, raw_attribute, offset)`.
pub fn rendered_tract(layer: &str, id: &str, raw_attribute: f64, offset: f64) -> RenderedFeature {
    let mut properties = Map::new();
    properties.insert("GEOID".to_owned(), Value::from(id));
    properties.insert(
        "Household_Income_at_Age_35_rP_gP_p25".to_owned(),
        json!(raw_attribute),
    );
    RenderedFeature {
        layer_id: layer.to_owned(),
        properties,
        geometry: square_geometry(offset).to_geojson(),
    }
}
