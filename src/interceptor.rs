use std::future::Future;
use std::time::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::busy::BusyStore;
use crate::transport::{Request, Response, Transport, TransportError};

/// Marks the busy store for the whole lifetime of each request.
///
/// The guard is taken when `send` is called, before the inner future is created, and released
/// when the request settles or its future is dropped.
#[derive(Debug, Clone)]
pub struct BusyLayer<T> {
    inner: T,
    busy: BusyStore,
}

impl<T: Transport> BusyLayer<T> {
    pub fn new(inner: T, busy: BusyStore) -> Self {
        BusyLayer { inner, busy }
    }
}

impl<T: Transport> Transport for BusyLayer<T> {
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let guard = self.busy.begin();
        let response = self.inner.send(request);
        async move {
            let result = response.await;
            drop(guard);
            result
        }
    }
}

/// Holds back successful responses for a fixed delay so loading states stay visible.
/// Failures pass through immediately.
#[derive(Debug, Clone)]
pub struct LatencyLayer<T> {
    inner: T,
    delay: Duration,
}

impl<T: Transport> LatencyLayer<T> {
    pub fn new(inner: T, delay: Duration) -> Self {
        LatencyLayer { inner, delay }
    }
}

impl<T: Transport> Transport for LatencyLayer<T> {
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, TransportError>> + Send {
        let response = self.inner.send(request);
        let delay = self.delay;
        async move {
            let response = response.await;
            if response.is_ok() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
    }
}

/// The intercepted transport every hook talks through, with typed verbs on top.
///
/// Busy wraps latency, so a request counts as busy until its delayed response is delivered.
#[derive(Debug, Clone)]
pub struct Agent<T> {
    chain: BusyLayer<LatencyLayer<T>>,
}

impl<T: Transport> Agent<T> {
    pub fn new(transport: T, busy: BusyStore, delay: Duration) -> Self {
        Agent {
            chain: BusyLayer::new(LatencyLayer::new(transport, delay), busy),
        }
    }

    pub async fn send(&self, request: Request) -> Result<Response, TransportError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(method = %request.method, path = %request.path, "dispatching request");
        #[cfg(feature = "tracing")]
        let (method, path) = (request.method, request.path.clone());

        let result = self.chain.send(request).await;

        #[cfg(feature = "tracing")]
        match &result {
            Ok(response) => tracing::debug!(%method, %path, status = response.status, "request completed"),
            Err(err) => tracing::debug!(%method, %path, error = %err, "request failed"),
        }
        result
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, TransportError> {
        self.send(Request::get(path)).await?.json()
    }

    /// GET that also returns the server's freshness hint.
    pub async fn get_with_max_age<R: DeserializeOwned>(&self, path: &str) -> Result<(R, Option<Duration>), TransportError> {
        let response = self.send(Request::get(path)).await?;
        Ok((response.json()?, response.max_age))
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, TransportError> {
        self.send(Request::post(path).with_json(body)?).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Response, TransportError> {
        self.send(Request::post(path)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, TransportError> {
        self.send(Request::put(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, TransportError> {
        self.send(Request::delete(path)).await
    }
}
