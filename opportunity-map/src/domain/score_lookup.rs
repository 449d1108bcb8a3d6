//! Headless opportunity score lookup for an address.
//!
//! Geocodes the address, asks the tileset for the tract at that point, and
//! projects its attribute with the same table the map paints with. When the
//! tileset has no attribute there, a mid-range estimate is reported and
//! flagged as such.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::geocoding::GeocodingService;
use super::ports::{GeocodeError, GeocodedAddress, TileQueryError, TileQuerySource};
use super::score::{OpportunityScore, ScoreProjector};
use super::tract::{AttributeKeys, TractId};

/// Attribute reported when the tileset has nothing at the address.
pub const ESTIMATED_RAW_ATTRIBUTE: f64 = 35_000.0;

/// Where a looked-up attribute came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Read from the tileset.
    TileQuery,
    /// Mid-range estimate; the tileset had no attribute at the point.
    Estimate,
}

/// Score for one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLookup {
    /// Geocoding hit the lookup used.
    pub address: GeocodedAddress,
    /// Tract containing the point, when the tileset reported one.
    pub tract_id: Option<TractId>,
    /// Attribute the score was projected from.
    pub raw_attribute: f64,
    /// Projected score.
    pub score: OpportunityScore,
    /// Provenance of `raw_attribute`.
    pub source: ScoreSource,
}

/// Errors raised by [`ScoreLookupService::lookup`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreLookupError {
    /// The address could not be geocoded.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// The tileset query failed.
    #[error(transparent)]
    TileQuery(#[from] TileQueryError),
}

/// Address to score pipeline.
pub struct ScoreLookupService {
    geocoder: Arc<GeocodingService>,
    tiles: Arc<dyn TileQuerySource>,
    keys: AttributeKeys,
    projector: ScoreProjector,
}

impl ScoreLookupService {
    /// Build a lookup over a shared geocoder and a tileset source.
    pub fn new(
        geocoder: Arc<GeocodingService>,
        tiles: Arc<dyn TileQuerySource>,
        keys: AttributeKeys,
    ) -> Self {
        Self {
            geocoder,
            tiles,
            keys,
            projector: ScoreProjector,
        }
    }

    /// Score the tract containing `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreLookupError`] when geocoding or the tileset query
    /// fails. A tileset with no attribute at the point is not an error.
    pub async fn lookup(&self, address: &str) -> Result<ScoreLookup, ScoreLookupError> {
        let hit = self.geocoder.geocode(address).await?;
        let features = self.tiles.features_at(hit.point).await?;

        let found = features.iter().find_map(|properties| {
            self.keys
                .raw_attribute(properties)
                .map(|raw| (raw, self.keys.tract_id(properties)))
        });
        let (raw_attribute, tract_id, source) = match found {
            Some((raw, tract_id)) => (raw, tract_id, ScoreSource::TileQuery),
            None => {
                info!(address = %hit.display_name, "no tract attribute at address, using estimate");
                (ESTIMATED_RAW_ATTRIBUTE, None, ScoreSource::Estimate)
            }
        };
        Ok(ScoreLookup {
            score: self.projector.score(raw_attribute),
            address: hit,
            tract_id,
            raw_attribute,
            source,
        })
    }
}
