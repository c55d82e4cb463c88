#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Async client core for the activities API.
//!
//! Requests go through an [`interceptor::Agent`] that keeps the [`busy::BusyStore`] up to date and
//! delays successful responses. Resource hooks mirror results into a [`cache::QueryCache`], and the
//! [`session::Session`] coordinator orders the cache updates around login and logout.

/// Observable count of in-flight requests
pub mod busy;
/// Keyed query cache with per-key request sequencing
pub mod cache;
/// Wiring of transport, cache, hooks and session
pub mod client;
/// Client settings from the environment or TOML
pub mod config;
/// Crate level errors
pub mod error;
/// Cache-backed resource façades
pub mod hooks;
/// Busy tracking and latency layers around a transport
pub mod interceptor;
/// Payloads exchanged with the API
pub mod model;
/// Login, logout, registration and the UI collaborators they drive
pub mod session;
/// Transports. Public traits are included to allow custom implementations.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ActivityClient;
#[cfg(feature = "http")]
pub use client::HttpActivityClient;
pub use config::ClientConfig;
pub use error::{Error, SessionPopulationError};
