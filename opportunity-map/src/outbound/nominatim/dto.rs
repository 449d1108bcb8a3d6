//! DTOs for decoding Nominatim JSON responses.
//!
//! Nominatim serialises coordinates as strings; a few mirrors emit numbers.
//! Both are accepted and mapped into domain records in one pass.

use serde::Deserialize;

use crate::domain::GeoPoint;
use crate::domain::ports::{GeocodedAddress, ReverseGeocoded};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CoordinateDto {
    Text(String),
    Number(f64),
}

impl CoordinateDto {
    fn value(&self, axis: &str) -> Result<f64, String> {
        let value = match self {
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|error| format!("{axis} {text:?} is not a number: {error}"))?,
            Self::Number(number) => *number,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("{axis} is not finite"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AddressDetailsDto {
    pub(super) country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchResultDto {
    pub(super) lat: CoordinateDto,
    pub(super) lon: CoordinateDto,
    #[serde(default)]
    pub(super) display_name: String,
    #[serde(default)]
    pub(super) address: Option<AddressDetailsDto>,
}

impl SearchResultDto {
    pub(super) fn into_domain(self) -> Result<GeocodedAddress, String> {
        let lat = self.lat.value("lat")?;
        let lon = self.lon.value("lon")?;
        let point = GeoPoint::new(lat, lon).map_err(|error| error.to_string())?;
        Ok(GeocodedAddress {
            point,
            display_name: self.display_name,
            country_code: country_code(self.address),
        })
    }
}

/// Reverse responses carry either a place or an `error` explaining that
/// nothing is known at the point.
#[derive(Debug, Deserialize)]
pub(super) struct ReverseResponseDto {
    #[serde(default)]
    pub(super) display_name: Option<String>,
    #[serde(default)]
    pub(super) address: Option<AddressDetailsDto>,
    #[serde(default)]
    pub(super) error: Option<String>,
}

impl ReverseResponseDto {
    pub(super) fn into_domain(self) -> Option<ReverseGeocoded> {
        if self.error.is_some() {
            return None;
        }
        let display_name = self.display_name?;
        Some(ReverseGeocoded {
            display_name,
            country_code: country_code(self.address),
        })
    }
}

fn country_code(address: Option<AddressDetailsDto>) -> Option<String> {
    address
        .and_then(|details| details.country_code)
        .map(|code| code.trim().to_ascii_lowercase())
        .filter(|code| !code.is_empty())
}
