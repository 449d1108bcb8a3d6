//! Opportunity map core: tract selection, geocoding, and opportunity scoring.
//!
//! The crate follows a hexagonal layout. `domain` owns the selection state
//! machine, the map view controller, the geocoding service, and the ports
//! they depend on. `outbound` holds HTTP adapters for the geocoding and tile
//! query services. `inbound` holds the command-line surface.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use settings::MapSettings;
