//! Map view controller: translates selection transitions into engine calls.
//!
//! The controller exclusively owns the engine for the lifetime of one mounted
//! view. Listeners are registered once in [`MapViewController::mount`], the
//! style is populated on the load event, and the engine is removed when the
//! controller is dropped.
//!
//! Address searches are split around their two suspension points. The
//! geocoding result arrives through [`MapViewController::address_geocoded`],
//! which starts the camera flight; the tract lookup only runs once the flight
//! settles and the engine reports [`MapEvent::MoveEnd`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::geo::{GeoPoint, TractGeometry};
use super::ports::{
    CameraTarget, EventSubscription, MapEngine, MapEngineError, MapEvent, MapEventKind,
    ScoreListener, ScoreUpdate,
};
use super::score::ScoreProjector;
use super::selection::{HighlightUpdate, SearchToken, SelectionChange, SelectionState};
use super::tract::{TractFeature, TractKey};
use super::tract_index::{QueryError, QueryPoint, TractFeatureIndex};

mod config;
mod layers;

pub use config::{
    DEFAULT_FLY_TO_ZOOM, DEFAULT_TILESET_URL, DEFAULT_TRACT_SOURCE_LAYER, MapViewConfig,
};

/// Cursor shown while the pointer is over a tract.
pub const POINTER_CURSOR: &str = "pointer";

/// Errors raised while driving the map engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapViewError {
    /// The engine rejected a call.
    #[error(transparent)]
    Engine(#[from] MapEngineError),
    /// A tract query violated its precondition.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Progress of an address search after its geocoding result arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchProgress {
    /// The camera is flying; the tract resolves on the next move end.
    Flying,
    /// The style is still loading; the flight starts once it has.
    AwaitingStyle,
    /// A newer search started; the result was dropped.
    Superseded,
}

/// What the view did in response to an engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Nothing relevant happened.
    Ignored,
    /// Sources and layers were installed.
    StyleInstalled,
    /// A slot was written and the highlight repainted.
    Selected(SelectionChange),
    /// A pending address search found no tract at its location.
    NoTractAtLocation,
    /// Cursor or pointer outline changed.
    PointerFeedback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingSearch {
    Idle,
    AwaitingStyle { token: SearchToken, point: GeoPoint },
    AwaitingMoveEnd { token: SearchToken, point: GeoPoint },
}

/// Owns the engine and the selection state of one mounted map view.
pub struct MapViewController<E: MapEngine> {
    engine: E,
    config: MapViewConfig,
    projector: ScoreProjector,
    index: TractFeatureIndex,
    selection: SelectionState,
    pending: PendingSearch,
    hovered: Option<TractKey>,
    listener: Arc<dyn ScoreListener>,
    last_reading: ScoreUpdate,
}

impl<E: MapEngine> MapViewController<E> {
    /// Take ownership of `engine` and register every listener exactly once.
    pub fn mount(mut engine: E, config: MapViewConfig, listener: Arc<dyn ScoreListener>) -> Self {
        let tract_layer = config.tract_layer_id.as_str();
        engine.subscribe(EventSubscription::global(MapEventKind::Load));
        engine.subscribe(EventSubscription::on_layer(MapEventKind::Click, tract_layer));
        engine.subscribe(EventSubscription::on_layer(MapEventKind::MouseEnter, tract_layer));
        engine.subscribe(EventSubscription::on_layer(MapEventKind::MouseLeave, tract_layer));
        engine.subscribe(EventSubscription::on_layer(MapEventKind::MouseMove, tract_layer));
        engine.subscribe(EventSubscription::global(MapEventKind::MoveEnd));

        let index = TractFeatureIndex::new(tract_layer, config.attribute_keys.clone());
        let selection = SelectionState::new();
        let last_reading = reading(&selection, &ScoreProjector);
        debug!(layer = %config.tract_layer_id, "map view mounted");
        Self {
            engine,
            config,
            projector: ScoreProjector,
            index,
            selection,
            pending: PendingSearch::Idle,
            hovered: None,
            listener,
            last_reading,
        }
    }

    /// Reset the selection and tear the engine down.
    pub fn unmount(mut self) {
        self.selection.reset();
        self.pending = PendingSearch::Idle;
        debug!("map view unmounted");
    }

    /// Current selection.
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Engine handle, for inspection.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// View configuration.
    pub const fn config(&self) -> &MapViewConfig {
        &self.config
    }

    /// Whether the style has loaded.
    pub const fn is_style_loaded(&self) -> bool {
        self.index.is_style_loaded()
    }

    /// Whether an address search is waiting on the style or the camera.
    pub const fn has_pending_search(&self) -> bool {
        !matches!(self.pending, PendingSearch::Idle)
    }

    /// Reading currently shown next to the map.
    pub fn active_reading(&self) -> ScoreUpdate {
        reading(&self.selection, &self.projector)
    }

    /// Dispatch one engine event.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError`] when the engine rejects a call or a query is
    /// issued before the style loaded.
    pub fn handle_event(&mut self, event: MapEvent) -> Result<EventOutcome, MapViewError> {
        match event {
            MapEvent::StyleLoaded => self.on_style_loaded(),
            MapEvent::Click { pixel } => self.on_click(QueryPoint::Pixel(pixel)),
            MapEvent::MoveEnd => self.on_move_end(),
            MapEvent::MouseEnter => {
                self.engine.set_cursor(POINTER_CURSOR);
                Ok(EventOutcome::PointerFeedback)
            }
            MapEvent::MouseLeave => {
                self.engine.set_cursor("");
                self.set_pointer_outline(None)?;
                Ok(EventOutcome::PointerFeedback)
            }
            MapEvent::MouseMove { pixel } => {
                let tract = self.index.first_tract_at(&self.engine, QueryPoint::Pixel(pixel))?;
                self.set_pointer_outline(tract.map(|tract| tract.key))?;
                Ok(EventOutcome::PointerFeedback)
            }
        }
    }

    /// Start an address search, invalidating any search still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError`] when clearing the highlight fails.
    pub fn begin_address_search(&mut self) -> Result<SearchToken, MapViewError> {
        let started = self.selection.begin_address_search();
        self.pending = PendingSearch::Idle;
        if self.is_style_loaded() {
            self.apply_highlight(&started.highlight)?;
            self.engine
                .set_source_data(&self.config.location_source_id, layers::empty_collection())?;
        }
        debug!(token = %started.token, "address search started");
        self.notify_if_changed();
        Ok(started.token)
    }

    /// Continue the search identified by `token` with its geocoded point.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError`] when the engine rejects the flight.
    pub fn address_geocoded(
        &mut self,
        token: SearchToken,
        point: GeoPoint,
    ) -> Result<SearchProgress, MapViewError> {
        if let Err(stale) = self.selection.ensure_current(token) {
            debug!(%stale, "dropping geocoding result for superseded search");
            return Ok(SearchProgress::Superseded);
        }
        if !self.is_style_loaded() {
            self.pending = PendingSearch::AwaitingStyle { token, point };
            return Ok(SearchProgress::AwaitingStyle);
        }
        self.fly_to(point, None);
        self.pending = PendingSearch::AwaitingMoveEnd { token, point };
        Ok(SearchProgress::Flying)
    }

    /// Animate the camera to `point`; `None` uses the configured zoom.
    pub fn fly_to(&mut self, point: GeoPoint, zoom: Option<f64>) {
        let zoom = zoom.unwrap_or(self.config.fly_to_zoom);
        self.engine.fly_to(CameraTarget {
            center: point,
            zoom,
        });
    }

    /// Paint `feature` as the highlighted tract.
    ///
    /// Writes the geometry into the highlight source and points the
    /// highlight filter at the property and value the feature's id was
    /// read from.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError::Engine`] when the style is missing the
    /// highlight source or layer.
    pub fn set_highlight(&mut self, feature: &TractFeature) -> Result<(), MapViewError> {
        self.engine.set_source_data(
            &self.config.highlight_source_id,
            feature.geometry.to_feature(),
        )?;
        self.engine.set_filter(
            &self.config.highlight_filter_layer_id,
            layers::id_filter(&feature.key),
        )?;
        Ok(())
    }

    /// Blank the highlight.
    ///
    /// # Errors
    ///
    /// Returns [`MapViewError::Engine`] when the style is missing the
    /// highlight source or layer.
    pub fn clear_highlight(&mut self) -> Result<(), MapViewError> {
        self.engine.set_source_data(
            &self.config.highlight_source_id,
            TractGeometry::empty().to_feature(),
        )?;
        self.engine.set_filter(
            &self.config.highlight_filter_layer_id,
            layers::no_tract_filter(self.config.attribute_keys.primary_id_key()),
        )?;
        Ok(())
    }

    fn on_style_loaded(&mut self) -> Result<EventOutcome, MapViewError> {
        if self.is_style_loaded() {
            return Ok(EventOutcome::Ignored);
        }
        for (id, source) in layers::sources(&self.config) {
            self.engine.add_source(&id, source)?;
        }
        let mut before = self.config.insert_before_layer.clone();
        for layer in layers::layers(&self.config, &self.projector) {
            // Only the choropleth goes beneath the labels; the rest stack on top of it.
            self.engine.add_layer(layer, before.take())?;
        }
        self.index.mark_style_loaded();
        info!(layer = %self.config.tract_layer_id, "map style loaded, tract layers installed");

        if let PendingSearch::AwaitingStyle { token, point } = self.pending {
            self.fly_to(point, None);
            self.pending = PendingSearch::AwaitingMoveEnd { token, point };
        }
        Ok(EventOutcome::StyleInstalled)
    }

    fn on_click(&mut self, point: QueryPoint) -> Result<EventOutcome, MapViewError> {
        let Some(feature) = self.index.first_tract_at(&self.engine, point)? else {
            debug!(?point, "click missed the tract layer");
            return Ok(EventOutcome::Ignored);
        };
        let change = self.selection.click_tract(feature);
        self.apply_highlight(&change.highlight)?;
        self.notify_if_changed();
        Ok(EventOutcome::Selected(change))
    }

    fn on_move_end(&mut self) -> Result<EventOutcome, MapViewError> {
        let PendingSearch::AwaitingMoveEnd { token, point } = self.pending else {
            return Ok(EventOutcome::Ignored);
        };
        self.pending = PendingSearch::Idle;

        let Some(feature) = self.index.first_tract_at(&self.engine, QueryPoint::Geo(point))? else {
            info!(lat = point.lat(), lon = point.lon(), "no census tract at geocoded location");
            return Ok(EventOutcome::NoTractAtLocation);
        };
        let change = match self.selection.resolve_address(token, feature) {
            Ok(change) => change,
            Err(stale) => {
                debug!(%stale, "dropping tract for superseded search");
                return Ok(EventOutcome::Ignored);
            }
        };
        self.apply_highlight(&change.highlight)?;
        self.engine
            .set_source_data(&self.config.location_source_id, point.to_point_feature())?;
        self.notify_if_changed();
        Ok(EventOutcome::Selected(change))
    }

    fn apply_highlight(&mut self, update: &HighlightUpdate) -> Result<(), MapViewError> {
        match update {
            HighlightUpdate::Show(feature) => self.set_highlight(feature),
            HighlightUpdate::Clear => self.clear_highlight(),
            HighlightUpdate::Keep => Ok(()),
        }
    }

    fn set_pointer_outline(&mut self, tract: Option<TractKey>) -> Result<(), MapViewError> {
        if self.hovered == tract || !self.is_style_loaded() {
            return Ok(());
        }
        let filter = tract.as_ref().map_or_else(
            || layers::no_tract_filter(self.config.attribute_keys.primary_id_key()),
            layers::id_filter,
        );
        self.engine.set_filter(&self.config.pointer_layer_id, filter)?;
        self.hovered = tract;
        Ok(())
    }

    fn notify_if_changed(&mut self) {
        let reading = self.active_reading();
        if self.last_reading == reading {
            return;
        }
        debug!(score = reading.score, tract = ?reading.tract_id, "active score changed");
        self.listener.score_changed(&reading);
        self.last_reading = reading;
    }
}

/// Reading derived from a selection: focus, else home, else score `0`.
fn reading(selection: &SelectionState, projector: &ScoreProjector) -> ScoreUpdate {
    let tract = selection.active_tract();
    let score = selection
        .active_score(projector)
        .unwrap_or_else(|| projector.score(0.0));
    ScoreUpdate {
        score: score.value,
        color: score.color,
        raw_attribute: tract.map(|tract| tract.raw_attribute),
        tract_id: tract.map(|tract| tract.id.clone()),
        source: selection.active_slot(),
    }
}

impl<E: MapEngine> Drop for MapViewController<E> {
    fn drop(&mut self) {
        self.engine.remove();
    }
}

impl<E: MapEngine + std::fmt::Debug> std::fmt::Debug for MapViewController<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapViewController")
            .field("engine", &self.engine)
            .field("selection", &self.selection)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
