//! Source and layer definitions installed when the style loads.

use serde_json::{Value, json};

use super::config::MapViewConfig;
use crate::domain::geo::TractGeometry;
use crate::domain::ports::{LayerKind, LayerSpec, SourceSpec};
use crate::domain::score::ScoreProjector;
use crate::domain::tract::TractKey;

const FILL_OPACITY: f64 = 0.8;
const OUTLINE_COLOR: &str = "#000000";

/// Sources to add, in order.
pub(super) fn sources(config: &MapViewConfig) -> Vec<(String, SourceSpec)> {
    vec![
        (
            config.tract_source_id.clone(),
            SourceSpec::Vector {
                url: config.tileset_url.clone(),
            },
        ),
        (
            config.highlight_source_id.clone(),
            SourceSpec::Geojson {
                data: TractGeometry::empty().to_feature(),
            },
        ),
        (
            config.location_source_id.clone(),
            SourceSpec::Geojson {
                data: empty_collection(),
            },
        ),
    ]
}

/// Layers to add, bottom to top.
pub(super) fn layers(config: &MapViewConfig, projector: &ScoreProjector) -> Vec<LayerSpec> {
    let tile_layer = |id: &str, kind: LayerKind, paint: Value, filter: Option<Value>| LayerSpec {
        id: id.to_owned(),
        kind,
        source: config.tract_source_id.clone(),
        source_layer: Some(config.tract_source_layer.clone()),
        paint,
        filter,
    };
    let id_key = config.attribute_keys.primary_id_key();

    vec![
        tile_layer(
            &config.tract_layer_id,
            LayerKind::Fill,
            json!({
                "fill-color": projector.fill_color_expression(&config.attribute_keys),
                "fill-opacity": FILL_OPACITY,
                "fill-outline-color": OUTLINE_COLOR,
            }),
            None,
        ),
        tile_layer(
            &config.outline_layer_id,
            LayerKind::Line,
            json!({ "line-color": OUTLINE_COLOR, "line-width": 0.75, "line-opacity": 0.7 }),
            None,
        ),
        tile_layer(
            &config.pointer_layer_id,
            LayerKind::Line,
            json!({ "line-color": OUTLINE_COLOR, "line-width": 1.5, "line-opacity": 0.6 }),
            Some(no_tract_filter(id_key)),
        ),
        tile_layer(
            &config.highlight_filter_layer_id,
            LayerKind::Line,
            json!({ "line-color": OUTLINE_COLOR, "line-width": 3, "line-opacity": 0.9 }),
            Some(no_tract_filter(id_key)),
        ),
        LayerSpec {
            id: config.highlight_layer_id.clone(),
            kind: LayerKind::Line,
            source: config.highlight_source_id.clone(),
            source_layer: None,
            paint: json!({
                "line-color": OUTLINE_COLOR,
                "line-width": ["interpolate", ["linear"], ["zoom"], 8, 3, 10, 5, 12, 8, 14, 12],
            }),
            filter: None,
        },
        LayerSpec {
            id: config.location_layer_id.clone(),
            kind: LayerKind::Circle,
            source: config.location_source_id.clone(),
            source_layer: None,
            paint: json!({
                "circle-radius": 10,
                "circle-color": OUTLINE_COLOR,
                "circle-stroke-width": 3,
                "circle-stroke-color": "#ffffff",
            }),
            filter: None,
        },
    ]
}

/// Filter matching the tract stored under `key`, compared with the stored
/// value's own type.
pub(super) fn id_filter(key: &TractKey) -> Value {
    json!(["==", key.property, key.value])
}

/// Filter matching no tract.
pub(super) fn no_tract_filter(id_key: &str) -> Value {
    json!(["==", id_key, ""])
}

/// GeoJSON collection with no features.
pub(super) fn empty_collection() -> Value {
    json!({ "type": "FeatureCollection", "features": [] })
}

#[cfg(test)]
mod tests {
    //! Style definition coverage.

    use super::*;
    use rstest::rstest;

    #[test]
    fn choropleth_paints_with_projector_expression() {
        let config = MapViewConfig::default();
        let layers = layers(&config, &ScoreProjector);
        let fill = layers
            .iter()
            .find(|layer| layer.id == config.tract_layer_id)
            .expect("fill layer present");

        assert_eq!(fill.kind, LayerKind::Fill);
        assert_eq!(
            fill.paint["fill-color"],
            ScoreProjector.fill_color_expression(&config.attribute_keys)
        );
        assert_eq!(fill.source_layer.as_deref(), Some(config.tract_source_layer.as_str()));
    }

    #[test]
    fn filtered_outlines_start_matching_nothing() {
        let config = MapViewConfig::default();
        for layer in layers(&config, &ScoreProjector)
            .iter()
            .filter(|layer| layer.filter.is_some())
        {
            assert_eq!(layer.filter, Some(json!(["==", "GEOID", ""])), "layer {}", layer.id);
        }
    }

    #[test]
    fn every_layer_draws_from_a_declared_source() {
        let config = MapViewConfig::default();
        let sources: Vec<_> = sources(&config).into_iter().map(|(id, _)| id).collect();
        for layer in layers(&config, &ScoreProjector) {
            assert!(sources.contains(&layer.source), "{} has no source", layer.id);
        }
    }

    #[rstest]
    #[case(TractKey::new("GEOID", json!("36061000100")), json!(["==", "GEOID", "36061000100"]))]
    #[case(TractKey::new("GEO_ID", json!("1400000US36061000100")), json!(["==", "GEO_ID", "1400000US36061000100"]))]
    #[case(TractKey::new("GEOID", json!(36061000100_u64)), json!(["==", "GEOID", 36061000100_u64]))]
    fn id_filter_compares_the_stored_property_and_value(#[case] key: TractKey, #[case] expected: Value) {
        assert_eq!(id_filter(&key), expected);
    }
}
