//! Image client: request building, transport and decoding in one call.

use crate::config::{EnvConfig, Endpoints, HttpClientConfig};
use crate::error::{ImageError, Result};
use crate::params::{ImageModel, ImageSize, Operation};
use crate::request::{ImageRequest, build_body};
use crate::response::{ImageResult, decode_response};
use crate::transport::HttpTransport;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

/// Client for the image generation and edit endpoints.
///
/// Holds only read-only state, so it can be cloned freely and shared across
/// tasks.
///
/// # Example
///
/// ```rust,ignore
/// use openai_images::{ImageClient, ImageModel, ImageSize};
///
/// let client = ImageClient::new("sk-...")?;
/// let images = client
///     .generate_image("a lighthouse at dusk", ImageModel::GptImage1, ImageSize::Square, 1)
///     .await?;
/// std::fs::write("lighthouse.png", images[0].data())?;
/// ```
#[derive(Clone)]
pub struct ImageClient<T = reqwest::Client> {
    transport: T,
    authorization: HeaderValue,
    endpoints: Arc<Endpoints>,
}

impl<T> std::fmt::Debug for ImageClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("endpoints", &self.endpoints)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ImageClient {
    /// Create a client for the default OpenAI endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Config`] if the key is empty or not a valid
    /// header value, or if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ImageClientBuilder {
        ImageClientBuilder::default()
    }

    /// Create a client from `OPENAI_API_KEY` and, optionally, `OPENAI_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Config`] if `OPENAI_API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self> {
        let env = EnvConfig::load(|name| std::env::var(name).ok())?;
        let mut builder = Self::builder().api_key(env.api_key);
        if let Some(base_url) = env.base_url {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }
}

impl<T> ImageClient<T>
where
    T: HttpTransport,
{
    /// Returns the configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Generate `count` images from a text prompt.
    ///
    /// # Errors
    ///
    /// [`ImageError::InvalidRequest`] if `count` is zero, otherwise any error
    /// from sending or decoding the request.
    pub async fn generate_image(
        &self,
        prompt: impl Into<String>,
        model: impl Into<ImageModel>,
        size: ImageSize,
        count: u32,
    ) -> Result<Vec<ImageResult>> {
        let request = ImageRequest::new(prompt)
            .with_model(model)
            .with_size(size)
            .with_count(non_zero_count(count)?);
        self.generate(&request).await
    }

    /// Edit one or more PNG images according to a prompt.
    ///
    /// The images are uploaded as given; an empty list is sent as-is and left
    /// for the server to reject.
    ///
    /// # Errors
    ///
    /// [`ImageError::InvalidRequest`] if `count` is zero, otherwise any error
    /// from sending or decoding the request.
    pub async fn edit_images<I, B>(
        &self,
        images: I,
        prompt: impl Into<String>,
        model: impl Into<ImageModel>,
        size: ImageSize,
        count: u32,
    ) -> Result<Vec<ImageResult>>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let request = ImageRequest::new(prompt)
            .with_model(model)
            .with_size(size)
            .with_count(non_zero_count(count)?)
            .with_images(images);
        self.edit(&request).await
    }

    /// Send a prepared request to the generation endpoint.
    ///
    /// # Errors
    ///
    /// Any error from sending or decoding the request.
    pub async fn generate(&self, request: &ImageRequest) -> Result<Vec<ImageResult>> {
        self.execute(Operation::Generate, request).await
    }

    /// Send a prepared request to the edit endpoint.
    ///
    /// # Errors
    ///
    /// Any error from sending or decoding the request.
    pub async fn edit(&self, request: &ImageRequest) -> Result<Vec<ImageResult>> {
        self.execute(Operation::Edit, request).await
    }

    async fn execute(
        &self,
        operation: Operation,
        request: &ImageRequest,
    ) -> Result<Vec<ImageResult>> {
        let url = self.endpoints.url_for(operation);
        let encoded = build_body(request, operation)?;
        let headers = self.headers(&encoded.content_type)?;

        debug!(
            operation = operation.as_str(),
            model = %request.model,
            size = %request.size,
            count = request.count.get(),
            images = request.source_images.len(),
            body_len = encoded.body.len(),
            "sending image request"
        );

        let response = self
            .transport
            .post(url, headers, encoded.body)
            .await
            .map_err(ImageError::Transport)?;

        debug!(
            status = %response.status,
            body_len = response.body.len(),
            "received image response"
        );

        let images = decode_response(response.status, &response.body, &self.transport).await?;

        info!(operation = operation.as_str(), images = images.len(), "image request complete");
        Ok(images)
    }

    fn headers(&self, content_type: &str) -> Result<HeaderMap> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| ImageError::decode(format!("invalid content type: {e}")))?;

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, content_type);
        Ok(headers)
    }
}

fn non_zero_count(count: u32) -> Result<NonZeroU32> {
    NonZeroU32::new(count).ok_or_else(|| ImageError::invalid_request("count must be at least 1"))
}

/// Builder for [`ImageClient`].
#[derive(Default)]
pub struct ImageClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    generations_url: Option<String>,
    edits_url: Option<String>,
    http: HttpClientConfig,
}

impl std::fmt::Debug for ImageClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClientBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("generations_url", &self.generations_url)
            .field("edits_url", &self.edits_url)
            .field("http", &self.http)
            .finish()
    }
}

impl ImageClientBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set a custom base URL; both endpoints are derived from it.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the generation endpoint URL.
    #[must_use]
    pub fn generations_url(mut self, url: impl Into<String>) -> Self {
        self.generations_url = Some(url.into());
        self
    }

    /// Override the edit endpoint URL.
    #[must_use]
    pub fn edits_url(mut self, url: impl Into<String>) -> Self {
        self.edits_url = Some(url.into());
        self
    }

    /// Set the request and connect timeout in seconds for the default transport.
    #[must_use]
    pub const fn timeout_secs(mut self, timeout: u64) -> Self {
        self.http.timeout_secs = Some(timeout);
        self.http.connect_timeout_secs = Some(timeout);
        self
    }

    /// Set the user agent of the default transport.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.http.user_agent = Some(user_agent.into());
        self
    }

    /// Build a client backed by a `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Config`] on a missing or malformed API key, or if
    /// the HTTP client cannot be built.
    pub fn build(self) -> Result<ImageClient> {
        let transport = self.http.build_client()?;
        self.build_with_transport(transport)
    }

    /// Build a client backed by `transport`. Timeout and user agent settings
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Config`] on a missing or malformed API key.
    pub fn build_with_transport<T>(self, transport: T) -> Result<ImageClient<T>>
    where
        T: HttpTransport,
    {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ImageError::config("API key is required"))?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ImageError::config("API key is not a valid header value"))?;
        authorization.set_sensitive(true);

        let mut endpoints = self
            .base_url
            .as_deref()
            .map_or_else(Endpoints::default, Endpoints::from_base_url);
        if let Some(url) = self.generations_url {
            endpoints.generations = url;
        }
        if let Some(url) = self.edits_url {
            endpoints.edits = url;
        }

        Ok(ImageClient {
            transport,
            authorization,
            endpoints: Arc::new(endpoints),
        })
    }
}
