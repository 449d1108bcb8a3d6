//! Reqwest-backed Nominatim geocoding adapter.
//!
//! This adapter owns transport details only: request construction, the
//! identifying user agent, HTTP error mapping, and JSON decoding into domain
//! records. Throttling and caching are the domain service's concern.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::dto::{ReverseResponseDto, SearchResultDto};
use crate::domain::GeoPoint;
use crate::domain::ports::{GeocodeError, GeocodedAddress, GeocodingSource, ReverseGeocoded};

const DEFAULT_USER_AGENT: &str = "RedesigningOpportunity/1.0";

/// Outbound identity for Nominatim requests.
///
/// The public instance's usage policy requires an identifying user agent.
pub struct NominatimHttpIdentity {
    /// HTTP user-agent sent to Nominatim.
    pub user_agent: String,
}

impl Default for NominatimHttpIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Geocoding source issuing HTTP GET requests against one Nominatim base URL.
pub struct NominatimHttpSource {
    client: Client,
    base_url: Url,
    user_agent: String,
}

impl NominatimHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_identity(base_url, timeout, NominatimHttpIdentity::default())
    }

    /// Build an adapter with an explicit outbound identity.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_identity(
        base_url: Url,
        timeout: Duration,
        identity: NominatimHttpIdentity,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            user_agent: identity.user_agent,
        })
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, GeocodeError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl GeocodingSource for NominatimHttpSource {
    async fn search(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let url = search_url(&self.base_url, address)?;
        let body = self.get(url).await?;
        parse_search(&body)
    }

    async fn reverse(&self, point: GeoPoint) -> Result<Option<ReverseGeocoded>, GeocodeError> {
        let url = reverse_url(&self.base_url, point)?;
        let body = self.get(url).await?;
        parse_reverse(&body)
    }
}

fn endpoint(base_url: &Url, segment: &str) -> Result<Url, GeocodeError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| {
            GeocodeError::transport(format!("geocoder base URL {base_url} cannot carry a path"))
        })?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

fn search_url(base_url: &Url, address: &str) -> Result<Url, GeocodeError> {
    let mut url = endpoint(base_url, "search")?;
    url.query_pairs_mut()
        .append_pair("q", address)
        .append_pair("format", "json")
        .append_pair("limit", "1")
        .append_pair("addressdetails", "1");
    Ok(url)
}

fn reverse_url(base_url: &Url, point: GeoPoint) -> Result<Url, GeocodeError> {
    let mut url = endpoint(base_url, "reverse")?;
    url.query_pairs_mut()
        .append_pair("format", "json")
        .append_pair("lat", &point.lat().to_string())
        .append_pair("lon", &point.lon().to_string());
    Ok(url)
}

fn parse_search(body: &[u8]) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results: Vec<SearchResultDto> = serde_json::from_slice(body).map_err(|error| {
        GeocodeError::decode(format!("invalid Nominatim search payload: {error}"))
    })?;
    results
        .into_iter()
        .next()
        .map(SearchResultDto::into_domain)
        .transpose()
        .map_err(GeocodeError::decode)
}

fn parse_reverse(body: &[u8]) -> Result<Option<ReverseGeocoded>, GeocodeError> {
    let decoded: ReverseResponseDto = serde_json::from_slice(body).map_err(|error| {
        GeocodeError::decode(format!("invalid Nominatim reverse payload: {error}"))
    })?;
    Ok(decoded.into_domain())
}

fn map_transport_error(error: reqwest::Error) -> GeocodeError {
    GeocodeError::transport(error.to_string())
}

fn map_status_error(status: StatusCode) -> GeocodeError {
    let status = match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    };
    GeocodeError::service_error(status)
}
