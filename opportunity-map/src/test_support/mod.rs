//! Test utilities for the opportunity-map crate.
//!
//! Shared doubles for unit tests (in `src/`) and behaviour tests (in
//! `tests/`). Compiled for tests and behind the `test-support` feature.

mod clock;
mod geocoding;
mod map_engine;
mod tracts;

pub use clock::{ImmediateSleeper, MutableClock, RecordingSleeper};
pub use geocoding::{RecordingScoreListener, ScriptedGeocodingSource, geocoded};
pub use map_engine::{EngineCall, RecordingMapEngine};
pub use tracts::{TRACT_LAYER, rendered_tract, square_geometry, tract_feature};
