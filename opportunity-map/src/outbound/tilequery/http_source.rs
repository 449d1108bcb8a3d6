//! Reqwest-backed Mapbox tilequery adapter.
//!
//! This adapter owns transport details only: URL construction, access token
//! handling, HTTP error mapping, and JSON decoding into property maps.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use tracing::debug;

use super::dto::FeatureCollectionDto;
use crate::domain::GeoPoint;
use crate::domain::ports::{TileQueryError, TileQuerySource};

/// Tileset queried by [`TilequeryHttpSource`].
pub struct TilequeryTarget {
    /// API base URL, for example `https://api.mapbox.com`.
    pub base_url: Url,
    /// Tileset id, for example `mahiar.bdsxlspn`.
    pub tileset_id: String,
    /// Access token; requests fail with [`TileQueryError::MissingToken`]
    /// when absent.
    pub access_token: Option<String>,
}

/// Tile query source issuing HTTP GET requests against one tileset.
pub struct TilequeryHttpSource {
    client: Client,
    target: TilequeryTarget,
}

impl TilequeryHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(target: TilequeryTarget, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, target })
    }
}

#[async_trait]
impl TileQuerySource for TilequeryHttpSource {
    async fn features_at(&self, point: GeoPoint) -> Result<Vec<Map<String, Value>>, TileQueryError> {
        let url = tilequery_url(&self.target, point)?;
        debug!(
            tileset = %self.target.tileset_id,
            lat = point.lat(),
            lon = point.lon(),
            "querying tileset"
        );
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_features(body.as_ref())
    }
}

fn tilequery_url(target: &TilequeryTarget, point: GeoPoint) -> Result<Url, TileQueryError> {
    let token = target
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(TileQueryError::missing_token)?;

    let mut url = target.base_url.clone();
    let position = format!("{},{}.json", point.lon(), point.lat());
    url.path_segments_mut()
        .map_err(|()| {
            TileQueryError::transport(format!(
                "tilequery base URL {} cannot carry a path",
                target.base_url
            ))
        })?
        .pop_if_empty()
        .extend(["v4", target.tileset_id.as_str(), "tilequery", position.as_str()]);
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

fn parse_features(body: &[u8]) -> Result<Vec<Map<String, Value>>, TileQueryError> {
    let decoded: FeatureCollectionDto = serde_json::from_slice(body).map_err(|error| {
        TileQueryError::decode(format!("invalid tilequery payload: {error}"))
    })?;
    Ok(decoded.into_properties())
}

fn map_transport_error(error: reqwest::Error) -> TileQueryError {
    TileQueryError::transport(error.to_string())
}

fn map_status_error(status: StatusCode) -> TileQueryError {
    let status = match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    };
    TileQueryError::service_error(status)
}
