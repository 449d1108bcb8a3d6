//! Tract lookup over the map engine's rendered-feature query.
//!
//! Clicks arrive as canvas pixels and address searches as coordinates; both
//! are funnelled through [`TractFeatureIndex::query_at`] so the selection
//! state never needs to know which trigger produced a tract.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{error, warn};

use super::geo::{GeoPoint, PixelPoint, TractGeometry};
use super::ports::{MapEngine, RenderedFeature};
use super::tract::{AttributeKeys, TractFeature};

/// Location to query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryPoint {
    /// Coordinate, projected through the engine before querying.
    Geo(GeoPoint),
    /// Canvas position, queried as is.
    Pixel(PixelPoint),
}

/// Errors raised by tract queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query ran before the style finished loading.
    ///
    /// Correct wiring gates every query on the load event, so this signals a
    /// logic fault rather than a recoverable condition.
    #[error("tract query issued before the map style finished loading")]
    StyleNotLoaded,
}

/// Decodes rendered features of one tract layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TractFeatureIndex {
    layer_id: String,
    keys: AttributeKeys,
    style_loaded: bool,
}

impl TractFeatureIndex {
    /// Index over `layer_id`, reading properties with `keys`.
    pub fn new(layer_id: impl Into<String>, keys: AttributeKeys) -> Self {
        Self {
            layer_id: layer_id.into(),
            keys,
            style_loaded: false,
        }
    }

    /// Record that the style has loaded; queries are allowed from now on.
    pub fn mark_style_loaded(&mut self) {
        self.style_loaded = true;
    }

    /// Whether queries are allowed.
    pub const fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    /// Tract layer id this index reads.
    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    /// Tracts rendered at `point`, topmost first, one per id.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::StyleNotLoaded`] before the load event.
    pub fn query_at<E>(&self, engine: &E, point: QueryPoint) -> Result<Vec<TractFeature>, QueryError>
    where
        E: MapEngine + ?Sized,
    {
        if !self.style_loaded {
            error!(layer = %self.layer_id, ?point, "tract query issued before style load");
            return Err(QueryError::StyleNotLoaded);
        }
        let pixel = match point {
            QueryPoint::Geo(geo) => engine.project(geo),
            QueryPoint::Pixel(pixel) => pixel,
        };
        let rendered = engine.query_rendered_features(pixel, std::slice::from_ref(&self.layer_id));

        let mut seen = HashSet::new();
        Ok(rendered
            .iter()
            .filter(|feature| feature.layer_id == self.layer_id)
            .filter_map(|feature| self.decode(feature))
            .filter(|tract| seen.insert(tract.id.clone()))
            .collect())
    }

    /// First tract rendered at `point`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::StyleNotLoaded`] before the load event.
    pub fn first_tract_at<E>(
        &self,
        engine: &E,
        point: QueryPoint,
    ) -> Result<Option<TractFeature>, QueryError>
    where
        E: MapEngine + ?Sized,
    {
        Ok(self.query_at(engine, point)?.into_iter().next())
    }

    /// Decode one rendered feature, skipping features without an id or with
    /// unusable geometry.
    ///
    /// A missing attribute reads as `0`, matching the paint expression's
    /// fallback.
    pub fn decode(&self, feature: &RenderedFeature) -> Option<TractFeature> {
        let Some((id, key)) = self.keys.tract_key(&feature.properties) else {
            warn!(layer = %feature.layer_id, "rendered tract has no id property");
            return None;
        };
        let geometry = match TractGeometry::from_geojson(&feature.geometry) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!(tract = %id, error = %err, "rendered tract geometry is unusable");
                return None;
            }
        };
        let raw_attribute = self.keys.raw_attribute(&feature.properties).unwrap_or(0.0);
        Some(TractFeature::new(id, raw_attribute, geometry).with_key(key))
    }
}

#[cfg(test)]
mod tests {
    //! Query gating and feature decoding coverage.

    use super::*;
    use crate::domain::ports::MockMapEngine;
    use rstest::{fixture, rstest};
    use serde_json::{Map, Value, json};

    const LAYER: &str = "census-tracts-layer";

    fn rendered(layer: &str, properties: Value) -> RenderedFeature {
        let Value::Object(properties) = properties else {
            panic!("properties must be an object");
        };
        RenderedFeature {
            layer_id: layer.to_owned(),
            properties,
            geometry: json!({
                "type": "Polygon",
                "coordinates": [[[-74.0, 40.0], [-73.9, 40.0], [-73.9, 40.1], [-74.0, 40.0]]]
            }),
        }
    }

    #[fixture]
    fn index() -> TractFeatureIndex {
        let mut index = TractFeatureIndex::new(LAYER, AttributeKeys::default());
        index.mark_style_loaded();
        index
    }

    #[test]
    fn refuses_queries_before_style_load() {
        let index = TractFeatureIndex::new(LAYER, AttributeKeys::default());
        let mut engine = MockMapEngine::new();
        engine.expect_query_rendered_features().never();
        engine.expect_project().never();

        let result = index.query_at(&engine, QueryPoint::Pixel(PixelPoint::new(1.0, 1.0)));

        assert_eq!(result, Err(QueryError::StyleNotLoaded));
    }

    #[rstest]
    fn geo_points_are_projected_before_querying(index: TractFeatureIndex) {
        let point = GeoPoint::new(40.05, -73.95).expect("valid point");
        let mut engine = MockMapEngine::new();
        engine
            .expect_project()
            .times(1)
            .withf(move |geo| *geo == point)
            .returning(|_| PixelPoint::new(12.0, 34.0));
        engine
            .expect_query_rendered_features()
            .times(1)
            .withf(|pixel, layers| {
                *pixel == PixelPoint::new(12.0, 34.0) && layers.len() == 1 && layers[0] == LAYER
            })
            .returning(|_, _| {
                vec![rendered(
                    LAYER,
                    json!({ "GEOID": "36061000100", "Household_Income_at_Age_35_rP_gP_p25": 35000 }),
                )]
            });

        let tract = index
            .first_tract_at(&engine, QueryPoint::Geo(point))
            .expect("style loaded")
            .expect("tract found");

        assert_eq!(tract.id.as_str(), "36061000100");
        assert_eq!(tract.raw_attribute, 35_000.0);
    }

    #[rstest]
    fn pixel_points_skip_projection(index: TractFeatureIndex) {
        let mut engine = MockMapEngine::new();
        engine.expect_project().never();
        engine
            .expect_query_rendered_features()
            .times(1)
            .returning(|_, _| Vec::new());

        let tracts = index
            .query_at(&engine, QueryPoint::Pixel(PixelPoint::new(3.0, 4.0)))
            .expect("style loaded");

        assert!(tracts.is_empty());
    }

    #[rstest]
    fn ignores_other_layers_and_duplicate_ids(index: TractFeatureIndex) {
        let mut engine = MockMapEngine::new();
        engine.expect_query_rendered_features().returning(|_, _| {
            vec![
                rendered("poi-label", json!({ "GEOID": "label" })),
                rendered(LAYER, json!({ "GEOID": "a" })),
                rendered(LAYER, json!({ "GEOID": "a" })),
                rendered(LAYER, json!({ "GEOID": "b" })),
            ]
        });

        let ids: Vec<_> = index
            .query_at(&engine, QueryPoint::Pixel(PixelPoint::new(0.0, 0.0)))
            .expect("style loaded")
            .into_iter()
            .map(|tract| tract.id.to_string())
            .collect();

        assert_eq!(ids, ["a", "b"]);
    }

    #[rstest]
    fn missing_attribute_reads_as_zero(index: TractFeatureIndex) {
        let tract = index
            .decode(&rendered(LAYER, json!({ "GEO_ID": "x" })))
            .expect("decodes");
        assert_eq!(tract.raw_attribute, 0.0);
    }

    #[rstest]
    #[case(json!({ "GEO_ID": "1400000US36061000100" }), "GEO_ID", json!("1400000US36061000100"))]
    #[case(json!({ "GEOID": 36061000100_u64 }), "GEOID", json!(36061000100_u64))]
    fn decoded_tracts_remember_their_tile_key(
        index: TractFeatureIndex,
        #[case] properties: Value,
        #[case] property: &str,
        #[case] value: Value,
    ) {
        let tract = index.decode(&rendered(LAYER, properties)).expect("decodes");
        assert_eq!(tract.key, crate::domain::tract::TractKey::new(property, value));
    }

    #[rstest]
    fn skips_features_without_id_or_geometry(index: TractFeatureIndex) {
        assert!(index.decode(&rendered(LAYER, json!({ "NAME": "no id" }))).is_none());

        let mut broken = rendered(LAYER, json!({ "GEOID": "x" }));
        broken.geometry = json!({ "type": "Point", "coordinates": [0.0, 0.0] });
        assert!(index.decode(&broken).is_none());

        let empty = RenderedFeature {
            layer_id: LAYER.to_owned(),
            properties: Map::new(),
            geometry: Value::Null,
        };
        assert!(index.decode(&empty).is_none());
    }
}
