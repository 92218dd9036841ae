//! Typed request parameters: model, size and response format.

use serde::{Serialize, Serializer};
use std::fmt;

/// Image model identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ImageModel {
    /// `gpt-image-1`, the default.
    #[default]
    GptImage1,
    /// `dall-e-2`.
    DallE2,
    /// `dall-e-3`.
    DallE3,
    /// Any other model identifier accepted by the API.
    Custom(String),
}

impl ImageModel {
    /// Returns the wire identifier of this model.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GptImage1 => "gpt-image-1",
            Self::DallE2 => "dall-e-2",
            Self::DallE3 => "dall-e-3",
            Self::Custom(id) => id,
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ImageModel {
    fn from(id: &str) -> Self {
        match id {
            "gpt-image-1" => Self::GptImage1,
            "dall-e-2" => Self::DallE2,
            "dall-e-3" => Self::DallE3,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ImageModel {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

impl Serialize for ImageModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Output image dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ImageSize {
    /// 256x256 (`dall-e-2` only).
    #[serde(rename = "256x256")]
    Small,
    /// 512x512 (`dall-e-2` only).
    #[serde(rename = "512x512")]
    Medium,
    /// 1024x1024.
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    /// 1536x1024.
    #[serde(rename = "1536x1024")]
    Landscape,
    /// 1024x1536.
    #[serde(rename = "1024x1536")]
    Portrait,
    /// Let the model choose.
    #[serde(rename = "auto")]
    Auto,
}

impl ImageSize {
    /// Returns the wire value of this size.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "256x256",
            Self::Medium => "512x512",
            Self::Square => "1024x1024",
            Self::Landscape => "1536x1024",
            Self::Portrait => "1024x1536",
            Self::Auto => "auto",
        }
    }

    /// Returns `(width, height)` in pixels, or `None` for [`ImageSize::Auto`].
    #[must_use]
    pub const fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Small => Some((256, 256)),
            Self::Medium => Some((512, 512)),
            Self::Square => Some((1024, 1024)),
            Self::Landscape => Some((1536, 1024)),
            Self::Portrait => Some((1024, 1536)),
            Self::Auto => None,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the server should return image payloads.
///
/// Left unset, the server picks; `gpt-image-1` always answers with base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResponseFormat {
    /// Inline base64 in `b64_json`.
    #[serde(rename = "b64_json")]
    B64Json,
    /// Short-lived download link in `url`.
    #[serde(rename = "url")]
    Url,
}

impl ResponseFormat {
    /// Returns the wire value of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::B64Json => "b64_json",
            Self::Url => "url",
        }
    }
}

/// Which endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Text-to-image generation, JSON body.
    Generate,
    /// Image edit, multipart body.
    Edit,
}

impl Operation {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
        }
    }
}
