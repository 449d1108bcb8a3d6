//! In-memory map engine recording every call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::domain::ports::{
    CameraTarget, EventSubscription, LayerSpec, MapEngine, MapEngineError, RenderedFeature,
    SourceSpec,
};
use crate::domain::{GeoPoint, PixelPoint};

/// Pixels per degree of the flat test projection.
const PIXELS_PER_DEGREE: f64 = 100.0;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `subscribe`.
    Subscribe(EventSubscription),
    /// `add_source`.
    AddSource {
        /// Source id.
        id: String,
        /// Source definition.
        source: SourceSpec,
    },
    /// `add_layer`.
    AddLayer {
        /// Layer definition.
        layer: LayerSpec,
        /// Layer it was inserted beneath.
        before: Option<String>,
    },
    /// `set_source_data`.
    SetSourceData {
        /// Source id.
        source_id: String,
        /// New data.
        data: Value,
    },
    /// `set_filter`.
    SetFilter {
        /// Layer id.
        layer_id: String,
        /// New filter.
        filter: Value,
    },
    /// `set_cursor`.
    SetCursor(String),
    /// `fly_to`.
    FlyTo(CameraTarget),
    /// `remove`.
    Remove,
}

#[derive(Debug, Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    sources: HashSet<String>,
    layers: HashSet<String>,
    placed: Vec<(PixelPoint, RenderedFeature)>,
}

/// Map engine double.
///
/// Clones share state, so a test can keep a handle after moving the engine
/// into a controller and still observe calls made during teardown.
/// Coordinates project onto a flat grid of [`PIXELS_PER_DEGREE`].
#[derive(Debug, Clone, Default)]
pub struct RecordingMapEngine {
    state: Arc<Mutex<EngineState>>,
}

impl RecordingMapEngine {
    /// Engine with nothing rendered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `feature` at `pixel`.
    pub fn place_at_pixel(&self, pixel: PixelPoint, feature: RenderedFeature) {
        self.lock().placed.push((pixel, feature));
    }

    /// Render `feature` at the projection of `point`.
    pub fn place_at(&self, point: GeoPoint, feature: RenderedFeature) {
        self.place_at_pixel(project(point), feature);
    }

    /// Stop rendering anything.
    pub fn clear_rendered(&self) {
        self.lock().placed.clear();
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    /// Calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Registered listeners, in order.
    pub fn subscriptions(&self) -> Vec<EventSubscription> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Subscribe(subscription) => Some(subscription.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids of added layers, bottom to top.
    pub fn layer_ids(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::AddLayer { layer, .. } => Some(layer.id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Latest data written to `source_id` after it was added.
    pub fn source_data(&self, source_id: &str) -> Option<Value> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            EngineCall::SetSourceData { source_id: id, data } if id == source_id => {
                Some(data.clone())
            }
            _ => None,
        })
    }

    /// Number of writes to `source_id`.
    pub fn source_writes(&self, source_id: &str) -> usize {
        self.count(|call| {
            matches!(call, EngineCall::SetSourceData { source_id: id, .. } if id == source_id)
        })
    }

    /// Latest filter set on `layer_id`.
    pub fn filter(&self, layer_id: &str) -> Option<Value> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            EngineCall::SetFilter { layer_id: id, filter } if id == layer_id => Some(filter.clone()),
            _ => None,
        })
    }

    /// Camera flights, in order.
    pub fn flights(&self) -> Vec<CameraTarget> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::FlyTo(target) => Some(*target),
                _ => None,
            })
            .collect()
    }

    /// Latest cursor style.
    pub fn cursor(&self) -> Option<String> {
        self.lock().calls.iter().rev().find_map(|call| match call {
            EngineCall::SetCursor(cursor) => Some(cursor.clone()),
            _ => None,
        })
    }

    /// Number of `remove` calls.
    pub fn removals(&self) -> usize {
        self.count(|call| matches!(call, EngineCall::Remove))
    }

    fn record(&self, call: EngineCall) {
        self.lock().calls.push(call);
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("engine mutex"),
        }
    }
}

fn project(point: GeoPoint) -> PixelPoint {
    PixelPoint::new(
        (point.lon() + 180.0) * PIXELS_PER_DEGREE,
        (90.0 - point.lat()) * PIXELS_PER_DEGREE,
    )
}

fn same_pixel(a: PixelPoint, b: PixelPoint) -> bool {
    (a.x - b.x).abs() < 0.5 && (a.y - b.y).abs() < 0.5
}

impl MapEngine for RecordingMapEngine {
    fn subscribe(&mut self, subscription: EventSubscription) {
        self.record(EngineCall::Subscribe(subscription));
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), MapEngineError> {
        let mut state = self.lock();
        if !state.sources.insert(id.to_owned()) {
            return Err(MapEngineError::rejected(format!("source {id} already exists")));
        }
        state.calls.push(EngineCall::AddSource {
            id: id.to_owned(),
            source,
        });
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<String>) -> Result<(), MapEngineError> {
        let mut state = self.lock();
        if !state.sources.contains(&layer.source) {
            return Err(MapEngineError::missing_source(layer.source));
        }
        if !state.layers.insert(layer.id.clone()) {
            return Err(MapEngineError::rejected(format!("layer {} already exists", layer.id)));
        }
        state.calls.push(EngineCall::AddLayer { layer, before });
        Ok(())
    }

    fn set_source_data(&mut self, source_id: &str, data: Value) -> Result<(), MapEngineError> {
        let mut state = self.lock();
        if !state.sources.contains(source_id) {
            return Err(MapEngineError::missing_source(source_id));
        }
        state.calls.push(EngineCall::SetSourceData {
            source_id: source_id.to_owned(),
            data,
        });
        Ok(())
    }

    fn set_filter(&mut self, layer_id: &str, filter: Value) -> Result<(), MapEngineError> {
        let mut state = self.lock();
        if !state.layers.contains(layer_id) {
            return Err(MapEngineError::missing_layer(layer_id));
        }
        state.calls.push(EngineCall::SetFilter {
            layer_id: layer_id.to_owned(),
            filter,
        });
        Ok(())
    }

    fn set_cursor(&mut self, cursor: &str) {
        self.record(EngineCall::SetCursor(cursor.to_owned()));
    }

    fn fly_to(&mut self, target: CameraTarget) {
        self.record(EngineCall::FlyTo(target));
    }

    fn project(&self, point: GeoPoint) -> PixelPoint {
        project(point)
    }

    fn query_rendered_features(&self, pixel: PixelPoint, layers: &[String]) -> Vec<RenderedFeature> {
        self.lock()
            .placed
            .iter()
            .filter(|(at, feature)| same_pixel(*at, pixel) && layers.contains(&feature.layer_id))
            .map(|(_, feature)| feature.clone())
            .collect()
    }

    fn remove(&mut self) {
        self.record(EngineCall::Remove);
    }
}
