//! Nominatim outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `GeocodingSource`
//! port.

mod dto;
mod http_source;

pub use http_source::{NominatimHttpIdentity, NominatimHttpSource};
