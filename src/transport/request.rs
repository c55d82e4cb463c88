use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing request. `path` is relative to the configured base URL and may carry a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// JSON encoded body
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, TransportError> {
        let bytes = serde_json::to_vec(body).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.body = Some(bytes);
        Ok(self)
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// Freshness lifetime advertised by the server through `Cache-Control`, if any.
    pub max_age: Option<Duration>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            max_age: None,
            body: body.into(),
        }
    }

    /// Build a 200 response with `value` serialized as JSON.
    pub fn json_ok<T: Serialize + ?Sized>(value: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(value).map_err(|e| TransportError::Encode(e.to_string()))?;
        Ok(Self::new(200, body))
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Uniform failure of a request: network, status, or (de)serialization.
///
/// Errors are plain data so the query cache can keep the last one around for `is_error` reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request url '{0}'")]
    InvalidUrl(String),
    #[error("{method} {path} failed: {message}")]
    Network {
        method: Method,
        path: String,
        message: String,
    },
    #[error("{method} {path} returned status {status}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("failed to encode request body: {0}")]
    Encode(String),
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Status code of the response, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Field-level messages from a rejected (400) request.
    pub fn validation(&self) -> Option<ValidationErrors> {
        match self {
            TransportError::Status { status: 400, body, .. } => ValidationErrors::from_body(body),
            _ => None,
        }
    }
}

/// Server-side validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationErrors {
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Parse a problem-details body. Returns `None` when it has no `errors` object.
    pub fn from_body(body: &str) -> Option<Self> {
        let parsed: ValidationErrors = serde_json::from_str(body).ok()?;
        if parsed.errors.is_empty() {
            return None;
        }
        Some(parsed)
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every message, flattened in field order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.values().flatten().map(String::as_str)
    }
}

/// Sends requests to the API.
///
/// Implementations resolve with `Ok` only for 2xx responses.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> impl std::future::Future<Output = Result<Response, TransportError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(&self, request: Request) -> impl std::future::Future<Output = Result<Response, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(body: &str) -> TransportError {
        TransportError::Status {
            method: Method::Post,
            path: "/activities".to_string(),
            status: 400,
            body: body.to_string(),
        }
    }

    #[test]
    fn validation_errors_are_read_from_problem_details() {
        let err = rejected(r#"{"title":"One or more validation errors occurred.","status":400,"errors":{"Title":["Title is required"],"Date":["Date must be in the future"]}}"#);
        let validation = err.validation().unwrap();
        assert_eq!(validation.field("Title"), ["Title is required".to_string()]);
        assert_eq!(validation.messages().count(), 2);
        assert!(validation.field("City").is_empty());
    }

    #[test]
    fn plain_bad_request_has_no_validation_errors() {
        assert_eq!(rejected("Problem saving activity").validation(), None);
        assert_eq!(rejected(r#"{"errors":{}}"#).validation(), None);
    }

    #[test]
    fn status_only_present_for_server_answers() {
        assert_eq!(rejected("").status(), Some(400));
        let network = TransportError::Network {
            method: Method::Get,
            path: "/activities".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(network.status(), None);
        assert!(!network.is_unauthorized());
    }

    #[test]
    fn client_setup_failure_names_no_request() {
        let err = TransportError::Client("no TLS backend".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "failed to build HTTP client: no TLS backend");
    }

    #[test]
    fn request_body_is_json() {
        let request = Request::put("/activities").with_json(&serde_json::json!({"id": "a1"})).unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.body.as_deref(), Some(br#"{"id":"a1"}"#.as_slice()));
    }
}
