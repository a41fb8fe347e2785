//! Cart, wishlist and checkout core for a small storefront.
//!
//! The crate is layered the usual way: `domain` holds plain records and the
//! store ports, `application` orchestrates them, `infrastructure` provides the
//! backends and `interfaces` the CSV batch surface used by the binary.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;
