//! Driven port for the interactive map engine.
//!
//! The engine renders vector tiles, animates the camera, and reports pointer
//! and lifecycle events. The domain drives it through this narrow surface so
//! the selection logic can be exercised without a browser.

use serde::Serialize;
use serde_json::{Map, Value};

use super::define_port_error;
use crate::domain::geo::{GeoPoint, PixelPoint};

/// Engine event kinds the view subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapEventKind {
    /// Style and sources finished loading.
    Load,
    /// Pointer click.
    Click,
    /// Pointer entered a layer.
    MouseEnter,
    /// Pointer left a layer.
    MouseLeave,
    /// Pointer moved over a layer.
    MouseMove,
    /// Camera movement settled.
    MoveEnd,
}

/// Listener registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSubscription {
    /// Event to listen for.
    pub kind: MapEventKind,
    /// Restrict delivery to events over this layer.
    pub layer: Option<String>,
}

impl EventSubscription {
    /// Subscribe to a map-wide event.
    pub const fn global(kind: MapEventKind) -> Self {
        Self { kind, layer: None }
    }

    /// Subscribe to an event scoped to one layer.
    pub fn on_layer(kind: MapEventKind, layer: impl Into<String>) -> Self {
        Self {
            kind,
            layer: Some(layer.into()),
        }
    }
}

/// Event delivered by the engine to the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// Style finished loading; sources and layers may now be added.
    StyleLoaded,
    /// Click at a canvas position.
    Click {
        /// Click position.
        pixel: PixelPoint,
    },
    /// Pointer entered the tract layer.
    MouseEnter,
    /// Pointer left the tract layer.
    MouseLeave,
    /// Pointer moved over the tract layer.
    MouseMove {
        /// Pointer position.
        pixel: PixelPoint,
    },
    /// Camera animation settled.
    MoveEnd,
}

impl MapEvent {
    /// Kind used when subscribing to this event.
    pub const fn kind(&self) -> MapEventKind {
        match self {
            Self::StyleLoaded => MapEventKind::Load,
            Self::Click { .. } => MapEventKind::Click,
            Self::MouseEnter => MapEventKind::MouseEnter,
            Self::MouseLeave => MapEventKind::MouseLeave,
            Self::MouseMove { .. } => MapEventKind::MouseMove,
            Self::MoveEnd => MapEventKind::MoveEnd,
        }
    }
}

/// Data source definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    /// Remote vector tileset.
    Vector {
        /// Tileset URL, e.g. `mapbox://user.tileset`.
        url: String,
    },
    /// Inline GeoJSON.
    Geojson {
        /// Feature or feature collection.
        data: Value,
    },
}

/// Layer rendering type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Stroked outlines.
    Line,
    /// Point markers.
    Circle,
}

/// Style layer definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    /// Unique layer id.
    pub id: String,
    /// Rendering type.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Source id the layer draws from.
    pub source: String,
    /// Layer inside a vector source.
    #[serde(rename = "source-layer", skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Paint properties.
    pub paint: Value,
    /// Feature filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

/// Camera animation target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTarget {
    /// Centre of the viewport after the animation.
    pub center: GeoPoint,
    /// Zoom level after the animation.
    pub zoom: f64,
}

/// Feature returned by a rendered-feature query.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    /// Style layer the feature was rendered by.
    pub layer_id: String,
    /// Tile properties.
    pub properties: Map<String, Value>,
    /// GeoJSON geometry object.
    pub geometry: Value,
}

define_port_error! {
    /// Errors surfaced by the map engine.
    pub enum MapEngineError {
        /// A source with this id does not exist.
        MissingSource {
            /// Source id.
            id: String
        } => "map source {id} does not exist",
        /// A layer with this id does not exist.
        MissingLayer {
            /// Layer id.
            id: String
        } => "map layer {id} does not exist",
        /// The engine refused the call.
        Rejected {
            /// Engine diagnostic.
            message: String
        } => "map engine rejected the call: {message}",
    }
}

/// Port for the map engine instance owned by one mounted view.
///
/// Calls are synchronous and happen on the UI thread; camera animations and
/// style loads complete later and are reported back as [`MapEvent`]s.
#[cfg_attr(test, mockall::automock)]
pub trait MapEngine: Send {
    /// Register a listener. Called exactly once per event during mount.
    fn subscribe(&mut self, subscription: EventSubscription);

    /// Add a data source.
    ///
    /// # Errors
    ///
    /// Returns [`MapEngineError`] when the engine rejects the source.
    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), MapEngineError>;

    /// Add a style layer, optionally beneath `before`.
    ///
    /// # Errors
    ///
    /// Returns [`MapEngineError`] when the engine rejects the layer.
    fn add_layer(&mut self, layer: LayerSpec, before: Option<String>)
    -> Result<(), MapEngineError>;

    /// Replace the data of a GeoJSON source.
    ///
    /// # Errors
    ///
    /// Returns [`MapEngineError::MissingSource`] for unknown sources.
    fn set_source_data(&mut self, source_id: &str, data: Value) -> Result<(), MapEngineError>;

    /// Replace a layer's filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`MapEngineError::MissingLayer`] for unknown layers.
    fn set_filter(&mut self, layer_id: &str, filter: Value) -> Result<(), MapEngineError>;

    /// Set the canvas cursor style; an empty string restores the default.
    fn set_cursor(&mut self, cursor: &str);

    /// Start an animated camera transition. Completion arrives as
    /// [`MapEvent::MoveEnd`].
    fn fly_to(&mut self, target: CameraTarget);

    /// Project a coordinate onto the canvas.
    fn project(&self, point: GeoPoint) -> PixelPoint;

    /// Features rendered at `pixel` by any of `layers`, topmost first.
    fn query_rendered_features(&self, pixel: PixelPoint, layers: &[String])
    -> Vec<RenderedFeature>;

    /// Tear down the engine and release its listeners.
    fn remove(&mut self);
}
