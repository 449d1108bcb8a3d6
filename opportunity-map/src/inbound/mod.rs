//! Inbound adapters.
//!
//! The command-line surface drives the domain services through their public
//! API; it never reaches an outbound adapter directly.

pub mod cli;
