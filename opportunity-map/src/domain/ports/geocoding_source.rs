//! Driven port for turning free-text addresses into coordinates.
//!
//! The domain owns the result shape and error taxonomy; adapters only map
//! their wire format onto it.

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;
use crate::domain::geo::GeoPoint;

/// One geocoding hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedAddress {
    /// Resolved coordinate.
    pub point: GeoPoint,
    /// Human-readable label returned by the service.
    pub display_name: String,
    /// Lower-case ISO 3166-1 alpha-2 country code, when reported.
    pub country_code: Option<String>,
}

/// Reverse geocoding hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverseGeocoded {
    /// Human-readable label for the coordinate.
    pub display_name: String,
    /// Lower-case ISO 3166-1 alpha-2 country code, when reported.
    pub country_code: Option<String>,
}

define_port_error! {
    /// Errors surfaced while geocoding.
    pub enum GeocodeError {
        /// The address was blank after trimming.
        InvalidAddress => "address must not be blank",
        /// The service returned no results.
        NotFound {
            /// Address as typed.
            address: String
        } => "no geocoding result for \"{address}\"",
        /// The address resolved outside the supported region.
        NonUsAddress {
            /// Country code reported by the service.
            country: String
        } => "address resolved outside the supported region (country: {country})",
        /// The service answered with a non-success status.
        ServiceError {
            /// Upstream status code and reason.
            status: String
        } => "geocoding service returned {status}",
        /// Network transport failed before a response arrived.
        Transport {
            /// Transport failure detail.
            message: String
        } => "geocoding transport failed: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Decoder failure detail.
            message: String
        } => "geocoding response decode failed: {message}",
    }
}

impl GeocodeError {
    /// Message suitable for showing to the person who typed the address.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidAddress => "Please enter an address to search for.".to_owned(),
            Self::NotFound { address } => {
                format!("We couldn't find \"{address}\". Check the spelling and try again.")
            }
            Self::NonUsAddress { .. } => {
                "That address is outside the United States. The map only covers US census tracts."
                    .to_owned()
            }
            Self::ServiceError { .. } | Self::Transport { .. } | Self::Decode { .. } => {
                "The address lookup service is unavailable right now. Please try again later."
                    .to_owned()
            }
        }
    }

    /// Whether the failure is a warning about the input rather than a fault.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress | Self::NotFound { .. } | Self::NonUsAddress { .. }
        )
    }
}

/// Port for forward and reverse geocoding lookups.
///
/// Implementations issue exactly one outbound request per call; caching and
/// throttling live in the domain service that wraps the port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeocodingSource: Send + Sync {
    /// Resolve an address to its best match, or `None` for zero results.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use opportunity_map::domain::ports::{FixtureGeocodingSource, GeocodingSource};
    ///
    /// # tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(async {
    /// let source = FixtureGeocodingSource;
    /// let hit = source.search("123 Main St").await?;
    /// assert!(hit.is_none());
    /// # Ok::<(), opportunity_map::domain::ports::GeocodeError>(())
    /// # }).expect("fixture lookup");
    /// ```
    async fn search(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;

    /// Describe a coordinate, or `None` when the service knows nothing there.
    async fn reverse(&self, point: GeoPoint) -> Result<Option<ReverseGeocoded>, GeocodeError>;
}

/// Fixture implementation that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureGeocodingSource;

#[async_trait]
impl GeocodingSource for FixtureGeocodingSource {
    async fn search(&self, _address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        Ok(None)
    }

    async fn reverse(&self, _point: GeoPoint) -> Result<Option<ReverseGeocoded>, GeocodeError> {
        Ok(None)
    }
}
