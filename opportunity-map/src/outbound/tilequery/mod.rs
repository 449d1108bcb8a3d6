//! Tile query outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `TileQuerySource`
//! port against the Mapbox tilequery API.

mod dto;
mod http_source;

pub use http_source::{TilequeryHttpSource, TilequeryTarget};
