//! In-memory transport for tests.
//!
//! Routes are keyed by exact URL. Unrouted URLs answer `404`.

use crate::error::BoxError;
use crate::transport::{HttpTransport, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMethod {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Method used.
    pub method: MockMethod,
    /// Target URL.
    pub url: String,
    /// Request headers (empty for `GET`).
    pub headers: HeaderMap,
    /// Request body (empty for `GET`).
    pub body: Bytes,
}

#[derive(Debug, Clone)]
enum Reply {
    Respond(TransportResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    reply: Reply,
    delay: Option<Duration>,
}

/// Transport that answers from a fixed routing table.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Create a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`.
    #[must_use]
    pub fn with_response(
        self,
        url: impl Into<String>,
        status: StatusCode,
        body: impl Into<Bytes>,
    ) -> Self {
        self.route(url.into(), Reply::Respond(TransportResponse::new(status, body)));
        self
    }

    /// Answer `url` with `status` and a JSON body.
    #[must_use]
    pub fn with_json(
        self,
        url: impl Into<String>,
        status: StatusCode,
        json: &serde_json::Value,
    ) -> Self {
        self.with_response(url, status, json.to_string())
    }

    /// Fail requests to `url` with a transport error.
    #[must_use]
    pub fn with_failure(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.route(url.into(), Reply::Fail(message.into()));
        self
    }

    /// Delay the answer for `url`. Must be called after the route is set.
    #[must_use]
    pub fn with_delay(self, url: &str, delay: Duration) -> Self {
        if let Some(route) = self.lock_routes().get_mut(url) {
            route.delay = Some(delay);
        }
        self
    }

    /// Returns every request seen so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the highest number of requests that were in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn route(&self, url: String, reply: Reply) {
        self.lock_routes().insert(url, Route { reply, delay: None });
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn dispatch(&self, request: RecordedRequest) -> Result<TransportResponse, BoxError> {
        let route = self.lock_routes().get(&request.url).cloned();
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = route.as_ref().and_then(|r| r.delay) {
            futures_timer::Delay::new(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match route.map(|r| r.reply) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(message.into()),
            None => Ok(TransportResponse::new(
                StatusCode::NOT_FOUND,
                format!("no mock route for {url}"),
            )),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<TransportResponse, BoxError> {
        self.dispatch(RecordedRequest {
            method: MockMethod::Post,
            url: url.to_string(),
            headers,
            body,
        })
        .await
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError> {
        self.dispatch(RecordedRequest {
            method: MockMethod::Get,
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
        .await
    }
}
