#![cfg_attr(docsrs, feature(doc_cfg))]
//! Async client for the OpenAI image generation and edit endpoints.
//!
//! A call builds the request body (JSON for generation, `multipart/form-data`
//! for edits), sends it with a bearer token, and decodes the response into raw
//! image bytes. Entries returned as URLs are downloaded concurrently; the
//! result order always matches the order of entries in the response.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_images::{ImageClient, ImageModel, ImageSize};
//!
//! let client = ImageClient::from_env()?;
//! let images = client
//!     .generate_image("a red bicycle", ImageModel::GptImage1, ImageSize::Square, 2)
//!     .await?;
//! for (i, image) in images.iter().enumerate() {
//!     std::fs::write(format!("bicycle-{i}.png"), image.data())?;
//! }
//! ```
//!
//! The HTTP layer sits behind [`HttpTransport`], so any client can be plugged
//! in with [`ImageClientBuilder::build_with_transport`]. [`mock::MockTransport`]
//! answers from an in-memory routing table for tests.

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod multipart;
pub mod params;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{ImageClient, ImageClientBuilder};
pub use config::{Endpoints, HttpClientConfig};
pub use error::{ErrorKind, ImageError, Result};
pub use params::{ImageModel, ImageSize, Operation, ResponseFormat};
pub use request::{EncodedBody, ImageRequest, build_body};
pub use response::{ImageResult, decode_response};
pub use transport::{HttpTransport, TransportResponse};
