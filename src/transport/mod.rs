/// Request/response types, the transport trait and its error
pub mod request;

/// Transport that uses the reqwest HTTP client, with cookies enabled
#[cfg(feature = "http")]
pub mod http;

pub use request::{Method, Request, Response, Transport, TransportError, ValidationErrors};
