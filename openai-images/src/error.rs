//! Error types for image generation and edit calls.
//!
//! Every failed call yields exactly one [`ImageError`]. Nothing is retried
//! and nothing is logged in place of being returned.

use reqwest::StatusCode;

/// Boxed error produced by an [`HttpTransport`](crate::transport::HttpTransport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for image client operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur while building, sending or decoding an image request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    /// Network or connection failure, surfaced verbatim from the transport.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// Non-2xx response without a parseable error envelope.
    #[error("HTTP {status}{}: {body}", source_suffix(url.as_deref()))]
    HttpStatus {
        /// Status code returned by the server.
        status: StatusCode,
        /// Raw response body, decoded lossily as UTF-8.
        body: String,
        /// Image URL whose download failed; `None` for endpoint responses.
        url: Option<String>,
    },

    /// The server returned an `{"error": {"message": ...}}` envelope.
    #[error("API error: {message}")]
    Api {
        /// Human readable message from the provider.
        message: String,
        /// Provider error type, e.g. `invalid_request_error`.
        error_type: Option<String>,
        /// Provider error code, e.g. `content_policy_violation`.
        code: Option<String>,
    },

    /// Body did not match the expected schema, or a payload was invalid.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller input the client refuses to send.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration is incomplete or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Categories of [`ImageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`ImageError::Transport`].
    Transport,
    /// See [`ImageError::HttpStatus`].
    HttpStatus,
    /// See [`ImageError::Api`].
    Api,
    /// See [`ImageError::Decode`].
    Decode,
    /// See [`ImageError::InvalidRequest`].
    InvalidRequest,
    /// See [`ImageError::Config`].
    Config,
}

impl ImageError {
    /// Create a transport error from any error type.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(error.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
            url: None,
        }
    }

    /// Create an HTTP status error for a failed image download.
    #[must_use]
    pub fn download_status(
        url: impl Into<String>,
        status: StatusCode,
        body: impl Into<String>,
    ) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
            url: Some(url.into()),
        }
    }

    /// Create an API error carrying only a message.
    #[must_use]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            error_type: None,
            code: None,
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(detail: impl Into<String>) -> Self {
        Self::Decode(detail.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::InvalidRequest(detail.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Api { .. } => ErrorKind::Api,
            Self::Decode(_) => ErrorKind::Decode,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the provider message if this is an API error.
    #[must_use]
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns the HTTP status if this is an HTTP status error.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the image URL if this error comes from a failed download.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { url, .. } => url.as_deref(),
            _ => None,
        }
    }
}

fn source_suffix(url: Option<&str>) -> String {
    url.map(|u| format!(" from {u}")).unwrap_or_default()
}
