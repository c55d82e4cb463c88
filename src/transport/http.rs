use std::time::Duration;
use cache_control::CacheControl;
use reqwest::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use url::Url;
use crate::transport::request::{Method, Request, Response, Transport, TransportError};

/// Transport backed by a cookie-keeping reqwest client.
///
/// Every request carries the cookies the server set earlier, so the session established by
/// `/login?useCookies=true` is replayed on later calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport with its own cookie store.
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing client. The client should have a cookie store enabled.
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        HttpTransport { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Concatenate instead of `Url::join` so an API prefix such as `/api` survives.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let joined = format!("{base}/{path}");
        Url::parse(&joined).map_err(|_| TransportError::InvalidUrl(joined))
    }

    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let url = self.url_for(&request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let network_error = |e: reqwest::Error| TransportError::Network {
            method: request.method,
            path: request.path.clone(),
            message: e.to_string(),
        };

        let mut builder = self.client.request(method, url);
        if let Some(body) = request.body.clone() {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body);
        }
        let response = builder.send().await.map_err(network_error)?;

        let status = response.status();
        let max_age = response.headers().get(CACHE_CONTROL).and_then(parse_max_age);
        let body = response.bytes().await.map_err(network_error)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                method: request.method,
                path: request.path,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        return Ok(Response {
            status: status.as_u16(),
            max_age,
            body: body.to_vec(),
        });
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> impl std::future::Future<Output = Result<Response, TransportError>> + Send {
        self.execute(request)
    }
}

/// Freshness lifetime from a `Cache-Control` header.
/// `must-revalidate` without `max-age` means the value is stale as soon as it arrives.
/// Unparseable headers are ignored.
pub fn parse_max_age(h: &HeaderValue) -> Option<Duration> {
    let s = h.to_str().ok()?;
    let cache_control = CacheControl::from_value(s)?;
    match cache_control.max_age {
        Some(max_age) => Some(max_age),
        None if cache_control.must_revalidate => Some(Duration::ZERO),
        None => None,
    }
}
