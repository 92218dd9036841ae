//! Response decoding and error classification.
//!
//! A response becomes either one [`ImageResult`] per `data` entry, in entry
//! order, or a single [`ImageError`]. Partial results are never returned.

use crate::error::{ImageError, Result};
use crate::transport::HttpTransport;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use futures::future::try_join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

/// Decoded image bytes, whichever way the server delivered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    data: Bytes,
}

impl ImageResult {
    /// Wrap raw image bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the result, returning the image bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Returns the size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for ImageResult {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Success payload of the generation and edit endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Unix timestamp of creation.
    pub created: Option<i64>,
    /// One entry per produced image.
    pub data: Vec<ImageData>,
    /// Token accounting, reported by `gpt-image-1`. A malformed block is
    /// dropped rather than failing the call.
    #[serde(default, deserialize_with = "lenient_usage")]
    pub usage: Option<Usage>,
}

/// A single image entry. Exactly one of `b64_json` and `url` is expected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    /// Base64 encoded image.
    pub b64_json: Option<String>,
    /// Download link for the image.
    pub url: Option<String>,
    /// Prompt actually used, when the model rewrote it.
    pub revised_prompt: Option<String>,
}

/// Token usage of an image request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    /// Total tokens billed.
    pub total_tokens: Option<u32>,
    /// Prompt and input image tokens.
    pub input_tokens: Option<u32>,
    /// Generated image tokens.
    pub output_tokens: Option<u32>,
    /// Breakdown of `input_tokens`.
    pub input_tokens_details: Option<InputTokensDetails>,
}

/// Breakdown of input tokens by modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct InputTokensDetails {
    /// Tokens spent on the text prompt.
    pub text_tokens: Option<u32>,
    /// Tokens spent on input images.
    pub image_tokens: Option<u32>,
}

fn lenient_usage<'de, D>(deserializer: D) -> std::result::Result<Option<Usage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<serde_json::Value>,
}

impl From<ErrorBody> for ImageError {
    fn from(body: ErrorBody) -> Self {
        let code = body.code.and_then(|code| match code {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        Self::Api {
            message: body.message,
            error_type: body.error_type,
            code,
        }
    }
}

fn error_envelope(body: &[u8]) -> Option<ImageError> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.into())
}

/// Classify a raw response without touching the network.
///
/// - non-2xx with an `error.message` envelope: [`ImageError::Api`]
/// - non-2xx otherwise: [`ImageError::HttpStatus`]
/// - 2xx that is an error envelope: [`ImageError::Api`]
/// - 2xx not matching the success schema: [`ImageError::Decode`]
///
/// # Errors
///
/// See above.
pub fn parse_response(status: StatusCode, body: &[u8]) -> Result<ApiResponse> {
    if !status.is_success() {
        return Err(error_envelope(body)
            .unwrap_or_else(|| ImageError::http_status(status, String::from_utf8_lossy(body))));
    }

    serde_json::from_slice::<ApiResponse>(body).map_err(|e| {
        error_envelope(body)
            .unwrap_or_else(|| ImageError::decode(format!("invalid image response: {e}")))
    })
}

enum Source {
    Inline(Bytes),
    Remote(String),
}

fn classify(index: usize, entry: ImageData) -> Result<Source> {
    if let Some(b64) = entry.b64_json {
        let bytes = BASE64_STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| ImageError::decode(format!("invalid base64 in entry {index}: {e}")))?;
        return Ok(Source::Inline(Bytes::from(bytes)));
    }
    entry
        .url
        .map(Source::Remote)
        .ok_or_else(|| ImageError::decode(format!("entry {index} has neither b64_json nor url")))
}

async fn download<T>(transport: &T, url: &str) -> Result<ImageResult>
where
    T: HttpTransport + ?Sized,
{
    debug!(url, "downloading image");
    let response = transport.get(url).await.map_err(ImageError::Transport)?;
    if !response.is_success() {
        warn!(url, status = %response.status, "image download failed");
        return Err(ImageError::download_status(
            url,
            response.status,
            String::from_utf8_lossy(&response.body),
        ));
    }
    Ok(ImageResult::new(response.body))
}

/// Turn response entries into image results.
///
/// Base64 entries are decoded up front, so a bad payload fails the call before
/// any download starts. URL entries are then fetched concurrently; results keep
/// entry order regardless of completion order.
///
/// # Errors
///
/// [`ImageError::Decode`] for invalid base64 or an empty entry, and the first
/// [`ImageError::Transport`] or [`ImageError::HttpStatus`] of any download.
pub async fn materialize<T>(data: Vec<ImageData>, transport: &T) -> Result<Vec<ImageResult>>
where
    T: HttpTransport + ?Sized,
{
    let sources = data
        .into_iter()
        .enumerate()
        .map(|(index, entry)| classify(index, entry))
        .collect::<Result<Vec<_>>>()?;

    try_join_all(sources.into_iter().map(|source| async move {
        match source {
            Source::Inline(bytes) => Ok(ImageResult::new(bytes)),
            Source::Remote(url) => download(transport, &url).await,
        }
    }))
    .await
}

/// Parse a response and materialize its images.
///
/// # Errors
///
/// Any error from [`parse_response`] or [`materialize`].
pub async fn decode_response<T>(
    status: StatusCode,
    body: &[u8],
    transport: &T,
) -> Result<Vec<ImageResult>>
where
    T: HttpTransport + ?Sized,
{
    let response = parse_response(status, body)?;
    materialize(response.data, transport).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::MockTransport;
    use serde_json::json;
    use std::time::Duration;

    fn b64(bytes: &[u8]) -> String {
        BASE64_STANDARD.encode(bytes)
    }

    fn body(value: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[tokio::test]
    async fn test_base64_entries_in_order() {
        let images: [&[u8]; 3] = [b"\x89PNG one", b"\x89PNG two", &[0, 255, 128, 7]];
        let payload = json!({
            "created": 1_713_833_628,
            "data": images.iter().map(|i| json!({ "b64_json": b64(i) })).collect::<Vec<_>>(),
        });

        let results = decode_response(StatusCode::OK, &body(&payload), &MockTransport::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for (result, expected) in results.iter().zip(images) {
            assert_eq!(result.data(), expected);
        }
    }

    #[tokio::test]
    async fn test_usage_is_parsed_but_optional() {
        let payload = json!({
            "created": 1,
            "data": [{ "b64_json": b64(b"x") }],
            "usage": {
                "total_tokens": 100,
                "input_tokens": 50,
                "output_tokens": 50,
                "input_tokens_details": { "text_tokens": 10, "image_tokens": 40 }
            }
        });
        let response = parse_response(StatusCode::OK, &body(&payload)).unwrap();
        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, Some(100));
        assert_eq!(usage.input_tokens_details.and_then(|d| d.image_tokens), Some(40));

        let response = parse_response(StatusCode::OK, br#"{"data":[]}"#).unwrap();
        assert!(response.usage.is_none());
        assert!(response.created.is_none());
    }

    #[tokio::test]
    async fn test_malformed_usage_keeps_images() {
        let mock = MockTransport::new();
        let usages = [
            json!({ "total_tokens": 1, "input_tokens_details": null }),
            json!({ "total_tokens": null }),
            json!({ "total_tokens": "many" }),
            serde_json::Value::Null,
        ];
        for usage in usages {
            let payload = json!({ "data": [{ "b64_json": b64(b"x") }], "usage": usage });
            let results = decode_response(StatusCode::OK, &body(&payload), &mock)
                .await
                .unwrap();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].data(), b"x");
        }

        let payload = json!({
            "data": [],
            "usage": { "total_tokens": 1, "input_tokens_details": null }
        });
        let usage = parse_response(StatusCode::OK, &body(&payload)).unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, Some(1));
        assert!(usage.input_tokens_details.is_none());
    }

    #[test]
    fn test_api_error_envelope() {
        let err = parse_response(
            StatusCode::BAD_REQUEST,
            br#"{"error":{"message":"bad prompt"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.api_message(), Some("bad prompt"));
    }

    #[test]
    fn test_api_error_type_and_code() {
        let payload = json!({
            "error": {
                "message": "blocked",
                "type": "invalid_request_error",
                "code": "content_policy_violation"
            }
        });
        let err = parse_response(StatusCode::BAD_REQUEST, &body(&payload)).unwrap_err();
        match err {
            ImageError::Api {
                message,
                error_type,
                code,
            } => {
                assert_eq!(message, "blocked");
                assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
                assert_eq!(code.as_deref(), Some("content_policy_violation"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_http_error_without_envelope() {
        let err = parse_response(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>").unwrap_err();
        match err {
            ImageError::HttpStatus {
                status,
                body,
                url,
            } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "<html>bad gateway</html>");
                assert!(url.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_envelope_on_success_status() {
        let err = parse_response(StatusCode::OK, br#"{"error":{"message":"quota"}}"#).unwrap_err();
        assert_eq!(err.api_message(), Some("quota"));
    }

    #[tokio::test]
    async fn test_missing_data_is_decode_failure() {
        let err = decode_response(StatusCode::OK, br#"{"created":1}"#, &MockTransport::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_invalid_base64_fails_whole_call() {
        let payload = json!({
            "data": [{ "b64_json": b64(b"fine") }, { "b64_json": "%%% not base64 %%%" }]
        });
        let err = decode_response(StatusCode::OK, &body(&payload), &MockTransport::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("entry 1"));
    }

    #[tokio::test]
    async fn test_empty_entry_is_decode_failure() {
        let err = decode_response(StatusCode::OK, br#"{"data":[{}]}"#, &MockTransport::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_url_entries_fetched_concurrently_in_entry_order() {
        let mock = MockTransport::new()
            .with_response("http://a/1.png", StatusCode::OK, "content-of-1")
            .with_delay("http://a/1.png", Duration::from_millis(80))
            .with_response("http://a/2.png", StatusCode::OK, "content-of-2")
            .with_delay("http://a/2.png", Duration::from_millis(5));
        let payload = json!({
            "data": [{ "url": "http://a/1.png" }, { "url": "http://a/2.png" }]
        });

        let results = decode_response(StatusCode::OK, &body(&payload), &mock)
            .await
            .unwrap();

        assert_eq!(results[0].data(), b"content-of-1");
        assert_eq!(results[1].data(), b"content-of-2");
        assert_eq!(mock.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_download_failure_aborts() {
        let mock = MockTransport::new()
            .with_response("http://a/1.png", StatusCode::OK, "ok")
            .with_failure("http://a/2.png", "connection reset");
        let payload = json!({
            "data": [{ "url": "http://a/1.png" }, { "url": "http://a/2.png" }]
        });

        let err = decode_response(StatusCode::OK, &body(&payload), &mock)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let mock = MockTransport::new()
            .with_response("http://a/gone.png", StatusCode::FORBIDDEN, "expired");
        let payload = json!({ "data": [{ "url": "http://a/gone.png" }] });

        let err = decode_response(StatusCode::OK, &body(&payload), &mock)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.url(), Some("http://a/gone.png"));
        assert!(err.to_string().contains("http://a/gone.png"));
    }

    #[tokio::test]
    async fn test_b64_preferred_over_url() {
        let mock = MockTransport::new();
        let payload = json!({
            "data": [{ "b64_json": b64(b"inline"), "url": "http://a/never.png" }]
        });
        let results = decode_response(StatusCode::OK, &body(&payload), &mock)
            .await
            .unwrap();
        assert_eq!(results[0].data(), b"inline");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_bad_base64_prevents_downloads() {
        let mock = MockTransport::new().with_response("http://a/1.png", StatusCode::OK, "1");
        let payload = json!({
            "data": [{ "url": "http://a/1.png" }, { "b64_json": "!!" }]
        });
        let err = decode_response(StatusCode::OK, &body(&payload), &mock)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_image_result_accessors() {
        let result = ImageResult::new(vec![1u8, 2, 3]);
        assert_eq!(result.len(), 3);
        assert!(!result.is_empty());
        assert_eq!(result.as_ref(), &[1u8, 2, 3]);
        assert_eq!(result.into_bytes(), Bytes::from_static(&[1, 2, 3]));
    }
}
