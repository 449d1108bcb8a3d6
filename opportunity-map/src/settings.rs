//! Service endpoints and tuning loaded via OrthoConfig.
//!
//! Every field is optional; accessors fall back to the public Nominatim
//! instance, the Mapbox API, and the opportunity tileset.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::map_view::{DEFAULT_FLY_TO_ZOOM, MapViewConfig};
use crate::domain::{GeocodingConfig, geocoding};

const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_USER_AGENT: &str = "RedesigningOpportunity/1.0";
const DEFAULT_TILEQUERY_BASE_URL: &str = "https://api.mapbox.com";
const DEFAULT_TILESET_ID: &str = "mahiar.bdsxlspn";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A URL setting did not parse.
    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Parser failure detail.
        message: String,
    },
}

/// Endpoints, identity, and throttling for the opportunity map services.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "OPPORTUNITY_MAP")]
pub struct MapSettings {
    /// Nominatim base URL.
    pub geocoder_base_url: Option<String>,
    /// User agent sent to the geocoder.
    pub user_agent: Option<String>,
    /// Minimum spacing between geocoder requests, in milliseconds.
    pub min_request_interval_ms: Option<u64>,
    /// Country code results must fall in; empty accepts every country.
    pub supported_country: Option<String>,
    /// Per-request HTTP timeout, in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Mapbox API base URL for tile queries.
    pub tilequery_base_url: Option<String>,
    /// Tileset holding the tract attributes.
    pub tileset_id: Option<String>,
    /// Mapbox access token for tile queries.
    pub mapbox_access_token: Option<String>,
    /// Zoom level used when flying to a searched address.
    pub fly_to_zoom: Option<f64>,
}

impl MapSettings {
    /// Return the geocoder base URL, falling back to the public instance.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the configured value does
    /// not parse.
    pub fn geocoder_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "geocoder_base_url",
            self.geocoder_base_url
                .as_deref()
                .unwrap_or(DEFAULT_GEOCODER_BASE_URL),
        )
    }

    /// Return the geocoder user agent, falling back to the default.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Return the per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Return the tilequery base URL, falling back to the Mapbox API.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the configured value does
    /// not parse.
    pub fn tilequery_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "tilequery_base_url",
            self.tilequery_base_url
                .as_deref()
                .unwrap_or(DEFAULT_TILEQUERY_BASE_URL),
        )
    }

    /// Return the tileset id, falling back to the opportunity tileset.
    pub fn tileset_id(&self) -> &str {
        self.tileset_id.as_deref().unwrap_or(DEFAULT_TILESET_ID)
    }

    /// Return the Mapbox access token, treating blank values as unset.
    pub fn mapbox_access_token(&self) -> Option<&str> {
        self.mapbox_access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Build the geocoding service configuration.
    pub fn geocoding_config(&self) -> GeocodingConfig {
        let min_request_interval = self
            .min_request_interval_ms
            .map_or(geocoding::DEFAULT_MIN_REQUEST_INTERVAL, Duration::from_millis);
        let supported_country = match self.supported_country.as_deref().map(str::trim) {
            None => Some(geocoding::DEFAULT_SUPPORTED_COUNTRY.to_owned()),
            Some("") => None,
            Some(country) => Some(country.to_ascii_lowercase()),
        };
        GeocodingConfig {
            min_request_interval,
            supported_country,
        }
    }

    /// Build the map view configuration.
    pub fn map_view_config(&self) -> MapViewConfig {
        MapViewConfig::default().with_fly_to_zoom(self.fly_to_zoom.unwrap_or(DEFAULT_FLY_TO_ZOOM))
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|error| SettingsError::InvalidUrl {
        field,
        message: error.to_string(),
    })
}
