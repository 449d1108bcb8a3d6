//! Identifiers and tunables for one mounted map view.

use crate::domain::tract::AttributeKeys;

/// Zoom level the camera flies to for an address search.
pub const DEFAULT_FLY_TO_ZOOM: f64 = 12.0;

/// Tileset holding the census tract polygons and their attributes.
pub const DEFAULT_TILESET_URL: &str = "mapbox://mahiar.bdsxlspn";

/// Layer name inside the tileset.
pub const DEFAULT_TRACT_SOURCE_LAYER: &str = "ct_tract_kfr_rP_gP_p25-8tx22d";

/// Source, layer, and property names used by the view.
///
/// The defaults match the production style; tests override individual ids
/// with struct update syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewConfig {
    /// Vector source holding the tracts.
    pub tract_source_id: String,
    /// Tileset URL of the tract source.
    pub tileset_url: String,
    /// Layer inside the tileset.
    pub tract_source_layer: String,
    /// Choropleth fill layer; also the layer clicks and queries target.
    pub tract_layer_id: String,
    /// Thin outline drawn around every tract.
    pub outline_layer_id: String,
    /// Tile-backed outline filtered to the highlighted tract id.
    pub highlight_filter_layer_id: String,
    /// Tile-backed outline filtered to the tract under the pointer.
    pub pointer_layer_id: String,
    /// GeoJSON source receiving the highlighted tract geometry.
    pub highlight_source_id: String,
    /// Outline layer drawing the highlight source.
    pub highlight_layer_id: String,
    /// GeoJSON source holding the geocoded location marker.
    pub location_source_id: String,
    /// Circle layer drawing the location marker.
    pub location_layer_id: String,
    /// Existing style layer the choropleth is inserted beneath.
    pub insert_before_layer: Option<String>,
    /// Property names for tract ids and the raw attribute.
    pub attribute_keys: AttributeKeys,
    /// Zoom used when flying to a geocoded address.
    pub fly_to_zoom: f64,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            tract_source_id: "ct-opportunity-data".to_owned(),
            tileset_url: DEFAULT_TILESET_URL.to_owned(),
            tract_source_layer: DEFAULT_TRACT_SOURCE_LAYER.to_owned(),
            tract_layer_id: "census-tracts-layer".to_owned(),
            outline_layer_id: "census-tracts-outline".to_owned(),
            highlight_filter_layer_id: "census-tracts-hover".to_owned(),
            pointer_layer_id: "census-tracts-pointer".to_owned(),
            highlight_source_id: "highlight-tract-source".to_owned(),
            highlight_layer_id: "highlight-tract-outline".to_owned(),
            location_source_id: "user-location-source".to_owned(),
            location_layer_id: "user-location-symbol".to_owned(),
            insert_before_layer: None,
            attribute_keys: AttributeKeys::default(),
            fly_to_zoom: DEFAULT_FLY_TO_ZOOM,
        }
    }
}

impl MapViewConfig {
    /// Override the fly-to zoom, ignoring non-finite or non-positive values.
    #[must_use]
    pub fn with_fly_to_zoom(mut self, zoom: f64) -> Self {
        if zoom.is_finite() && zoom > 0.0 {
            self.fly_to_zoom = zoom;
        }
        self
    }
}
