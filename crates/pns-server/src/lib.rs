//! PNS server - HTTP front end for the phone number naming registry.
//!
//! Wraps a [`pns_core::Registry`] behind an axum router, serializes
//! mutations through a single write lock and snapshots the registry state
//! to disk after every accepted change.

pub mod api;
pub mod config;
pub mod error;
pub mod persistence;

pub use config::Config;
pub use error::ApiError;
pub use persistence::Store;
