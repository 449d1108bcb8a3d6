//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod geocoding_source;
mod map_engine;
mod score_listener;
mod tile_query_source;

#[cfg(test)]
pub use geocoding_source::MockGeocodingSource;
pub use geocoding_source::{
    FixtureGeocodingSource, GeocodeError, GeocodedAddress, GeocodingSource, ReverseGeocoded,
};
#[cfg(test)]
pub use map_engine::MockMapEngine;
pub use map_engine::{
    CameraTarget, EventSubscription, LayerKind, LayerSpec, MapEngine, MapEngineError, MapEvent,
    MapEventKind, RenderedFeature, SourceSpec,
};
pub use score_listener::{NoOpScoreListener, ScoreListener, ScoreUpdate};
#[cfg(test)]
pub use tile_query_source::MockTileQuerySource;
pub use tile_query_source::{FixtureTileQuerySource, TileQueryError, TileQuerySource};
