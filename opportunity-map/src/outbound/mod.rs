//! Outbound adapters.
//!
//! HTTP implementations of the geocoding and tile query ports. Each adapter
//! owns transport details only; caching, throttling, and region checks live
//! in the domain services that call them.

pub mod nominatim;
pub mod tilequery;
