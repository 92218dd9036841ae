//! HTTP transport abstraction.
//!
//! The client only needs two verbs: POST a prepared body to an endpoint, and
//! GET a remote image. [`HttpTransport`] is implemented for
//! [`reqwest::Client`]; tests substitute [`MockTransport`](crate::mock::MockTransport).

use crate::error::BoxError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::sync::Arc;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response from a status and body.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Minimal HTTP client used by [`ImageClient`](crate::ImageClient).
///
/// Implementations must be safe to share between concurrent calls. Errors are
/// reported as-is and wrapped into [`ImageError::Transport`](crate::ImageError::Transport)
/// by the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `body` to `url` with the given headers.
    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<TransportResponse, BoxError>;

    /// GET `url`.
    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<TransportResponse, BoxError> {
        let response = Self::post(self, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        buffer(response).await
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError> {
        let response = Self::get(self, url).send().await?;
        buffer(response).await
    }
}

async fn buffer(response: reqwest::Response) -> Result<TransportResponse, BoxError> {
    let status = response.status();
    let body = response.bytes().await?;
    Ok(TransportResponse { status, body })
}

#[async_trait]
impl<T> HttpTransport for Arc<T>
where
    T: HttpTransport + ?Sized,
{
    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<TransportResponse, BoxError> {
        (**self).post(url, headers, body).await
    }

    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError> {
        (**self).get(url).await
    }
}
