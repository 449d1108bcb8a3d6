//! Domain primitives, services, and ports.
//!
//! Purpose: Model tract selection for the opportunity map independently of
//! the map engine, the geocoder, and the tileset service, which are reached
//! only through the traits in [`ports`].
//!
//! Public surface:
//! - GeoPoint, PixelPoint, TractGeometry: coordinate and geometry values.
//! - TractId, TractKey, TractFeature, AttributeKeys: tract identity and decoding.
//! - ScoreProjector: income to 0–10 score and colour, shared by paint and
//!   readout.
//! - SelectionState: home/focus slots with search tokens.
//! - TractFeatureIndex: rendered-feature queries behind the style gate.
//! - MapViewController, MapSession: engine ownership and async searches.
//! - GeocodingService, ScoreLookupService: cached lookups over ports.

pub mod geo;
pub mod geocoding;
pub mod map_session;
pub mod map_view;
pub mod ports;
pub mod score;
pub mod score_lookup;
pub mod selection;
pub mod tract;
pub mod tract_index;

pub use self::geo::{
    GeoPoint, GeoPointValidationError, GeometryDecodeError, PixelPoint, Ring, TractGeometry,
};
pub use self::geocoding::{
    AddressKey, GeocodingConfig, GeocodingService, ThrottleSleeper, TokioSleeper,
};
pub use self::map_session::{MapSession, SearchOutcome, SessionError};
pub use self::map_view::{
    EventOutcome, MapViewConfig, MapViewController, MapViewError, SearchProgress,
};
pub use self::score::{LegendEntry, MAX_SCORE, OpportunityScore, ScoreProjector};
pub use self::score_lookup::{
    ESTIMATED_RAW_ATTRIBUTE, ScoreLookup, ScoreLookupError, ScoreLookupService, ScoreSource,
};
pub use self::selection::{
    HighlightUpdate, SearchStarted, SearchToken, SelectionChange, SelectionPhase, SelectionSlot,
    SelectionState, StaleSearch,
};
pub use self::tract::{AttributeKeys, TractFeature, TractId, TractIdValidationError, TractKey};
pub use self::tract_index::{QueryError, QueryPoint, TractFeatureIndex};
