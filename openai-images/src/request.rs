//! Request construction for the generation and edit endpoints.
//!
//! [`build_body`] turns an [`ImageRequest`] into the content type and bytes
//! that go on the wire. It performs no I/O.

use crate::error::{ImageError, Result};
use crate::multipart::MultipartBody;
use crate::params::{ImageModel, ImageSize, Operation, ResponseFormat};
use bytes::Bytes;
use serde::Serialize;
use std::num::NonZeroU32;

/// Content type of generation requests.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of every uploaded source image.
pub const SOURCE_IMAGE_CONTENT_TYPE: &str = "image/png";

/// Form field name of uploaded source images.
pub const SOURCE_IMAGE_FIELD: &str = "image[]";

/// Parameters shared by generation and edit requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Text description of the desired image.
    pub prompt: String,
    /// Model to use.
    pub model: ImageModel,
    /// Output dimensions.
    pub size: ImageSize,
    /// Number of images to produce.
    pub count: NonZeroU32,
    /// Images to edit, sent as PNG file parts. Empty for generation.
    pub source_images: Vec<Bytes>,
    /// Requested payload encoding; the server decides when `None`.
    pub response_format: Option<ResponseFormat>,
}

impl ImageRequest {
    /// Create a request for one image with default model and size.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: ImageModel::default(),
            size: ImageSize::default(),
            count: NonZeroU32::MIN,
            source_images: Vec::new(),
            response_format: None,
        }
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<ImageModel>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output size.
    #[must_use]
    pub const fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    /// Set the number of images.
    #[must_use]
    pub const fn with_count(mut self, count: NonZeroU32) -> Self {
        self.count = count;
        self
    }

    /// Append a source image for an edit request.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<Bytes>) -> Self {
        self.source_images.push(image.into());
        self
    }

    /// Replace all source images.
    #[must_use]
    pub fn with_images<I, B>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.source_images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Set the response format.
    #[must_use]
    pub const fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// A request body ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    /// Value for the `Content-Type` header.
    pub content_type: String,
    /// Body bytes.
    pub body: Bytes,
}

/// Wire schema of a generation request.
#[derive(Debug, Serialize)]
struct GenerationBody<'a> {
    prompt: &'a str,
    model: &'a ImageModel,
    size: ImageSize,
    #[serde(rename = "n")]
    count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Build the body for `operation`.
///
/// Generation produces JSON. Edit produces multipart with `model`, `prompt`,
/// `size` and `n` fields followed by one `image[]` part per source image,
/// named `image0.png`, `image1.png`, ... An edit without source images still
/// yields a well-formed body.
///
/// # Errors
///
/// Returns [`ImageError::Decode`] if serialization fails.
pub fn build_body(request: &ImageRequest, operation: Operation) -> Result<EncodedBody> {
    match operation {
        Operation::Generate => build_generation_body(request),
        Operation::Edit => build_edit_body(request).encode(),
    }
}

fn build_generation_body(request: &ImageRequest) -> Result<EncodedBody> {
    let body = GenerationBody {
        prompt: &request.prompt,
        model: &request.model,
        size: request.size,
        count: request.count.get(),
        response_format: request.response_format,
    };
    let json = serde_json::to_vec(&body).map_err(|e| ImageError::decode(e.to_string()))?;

    Ok(EncodedBody {
        content_type: JSON_CONTENT_TYPE.to_string(),
        body: Bytes::from(json),
    })
}

/// Assemble the multipart parts of an edit request.
#[must_use]
pub fn build_edit_body(request: &ImageRequest) -> MultipartBody {
    let mut body = MultipartBody::new()
        .text("model", request.model.as_str())
        .text("prompt", request.prompt.as_str())
        .text("size", request.size.as_str())
        .text("n", request.count.to_string());

    if let Some(format) = request.response_format {
        body = body.text("response_format", format.as_str());
    }

    request
        .source_images
        .iter()
        .enumerate()
        .fold(body, |body, (index, image)| {
            body.file(
                SOURCE_IMAGE_FIELD,
                format!("image{index}.png"),
                SOURCE_IMAGE_CONTENT_TYPE,
                image.clone(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::{self, Part};

    #[test]
    fn test_request_defaults() {
        let request = ImageRequest::new("a lighthouse");
        assert_eq!(request.model, ImageModel::GptImage1);
        assert_eq!(request.size, ImageSize::Square);
        assert_eq!(request.count.get(), 1);
        assert!(request.source_images.is_empty());
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_generation_body_json() {
        let request = ImageRequest::new("a lighthouse")
            .with_model(ImageModel::DallE3)
            .with_size(ImageSize::Landscape)
            .with_count(NonZeroU32::new(3).unwrap());
        let encoded = build_body(&request, Operation::Generate).unwrap();

        assert_eq!(encoded.content_type, "application/json");
        let json: serde_json::Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "a lighthouse",
                "model": "dall-e-3",
                "size": "1536x1024",
                "n": 3
            })
        );
    }

    #[test]
    fn test_generation_body_with_response_format() {
        let request = ImageRequest::new("x").with_response_format(ResponseFormat::Url);
        let encoded = build_body(&request, Operation::Generate).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(json["response_format"], "url");
    }

    #[test]
    fn test_generation_ignores_source_images() {
        let request = ImageRequest::new("x").with_image(vec![1u8, 2, 3]);
        let encoded = build_body(&request, Operation::Generate).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&encoded.body).unwrap();
        assert!(json.get("image").is_none());
        assert_eq!(json.as_object().map(serde_json::Map::len), Some(4));
    }

    #[test]
    fn test_edit_body_parts_in_order() {
        let request = ImageRequest::new("add a hat")
            .with_size(ImageSize::Portrait)
            .with_count(NonZeroU32::new(2).unwrap())
            .with_images([vec![1u8, 1], vec![2u8, 2, 2]]);
        let encoded = build_body(&request, Operation::Edit).unwrap();
        assert!(encoded.content_type.starts_with("multipart/form-data; boundary="));

        let parts = multipart::parse(&encoded.content_type, &encoded.body).unwrap();
        let names: Vec<_> = parts.iter().map(Part::name).collect();
        assert_eq!(names, ["model", "prompt", "size", "n", "image[]", "image[]"]);

        assert_eq!(
            parts[1],
            Part::Field {
                name: "prompt".into(),
                value: "add a hat".into()
            }
        );
        assert_eq!(
            parts[5],
            Part::File {
                name: "image[]".into(),
                filename: "image1.png".into(),
                content_type: "image/png".into(),
                data: Bytes::from_static(&[2, 2, 2]),
            }
        );
    }

    #[test]
    fn test_edit_body_without_images_is_valid() {
        let request = ImageRequest::new("nothing to edit");
        let encoded = build_body(&request, Operation::Edit).unwrap();

        let body = std::str::from_utf8(&encoded.body).unwrap();
        let boundary = encoded.content_type.split_once("boundary=").unwrap().1;
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));

        let parts = multipart::parse(&encoded.content_type, &encoded.body).unwrap();
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|p| matches!(p, Part::Field { .. })));
    }

    #[test]
    fn test_edit_body_response_format_field() {
        let request = ImageRequest::new("x")
            .with_response_format(ResponseFormat::B64Json)
            .with_image(vec![0u8]);
        let parts = build_edit_body(&request);
        let names: Vec<_> = parts.parts().iter().map(Part::name).collect();
        assert_eq!(names, ["model", "prompt", "size", "n", "response_format", "image[]"]);
    }
}
