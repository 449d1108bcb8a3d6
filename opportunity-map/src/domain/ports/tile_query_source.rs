//! Driven port for headless tract attribute lookups.
//!
//! Unlike the map engine's rendered-feature query this reaches the tileset
//! directly, so a score can be computed without a mounted view.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::define_port_error;
use crate::domain::geo::GeoPoint;

define_port_error! {
    /// Errors surfaced while querying the tileset.
    pub enum TileQueryError {
        /// No access token is configured.
        MissingToken => "tile query access token is not configured",
        /// The service answered with a non-success status.
        ServiceError {
            /// Upstream status code and reason.
            status: String
        } => "tile query service returned {status}",
        /// Network transport failed before a response arrived.
        Transport {
            /// Transport failure detail.
            message: String
        } => "tile query transport failed: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Decoder failure detail.
            message: String
        } => "tile query response decode failed: {message}",
    }
}

/// Port returning the properties of tileset features containing a point.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TileQuerySource: Send + Sync {
    /// Properties of every feature at `point`, nearest first.
    async fn features_at(&self, point: GeoPoint) -> Result<Vec<Map<String, Value>>, TileQueryError>;
}

/// Fixture implementation returning no features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTileQuerySource;

#[async_trait]
impl TileQuerySource for FixtureTileQuerySource {
    async fn features_at(
        &self,
        _point: GeoPoint,
    ) -> Result<Vec<Map<String, Value>>, TileQueryError> {
        Ok(Vec::new())
    }
}
