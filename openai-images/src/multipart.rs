//! `multipart/form-data` body encoder.
//!
//! Only what the edit endpoint needs: ordered text fields and file parts,
//! materialized into a single buffer with a per-body random boundary.
//!
//! Layout of an encoded body:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="model"\r\n
//! \r\n
//! gpt-image-1\r\n
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="image[]"; filename="image0.png"\r\n
//! Content-Type: image/png\r\n
//! \r\n
//! <bytes>\r\n
//! --{boundary}--\r\n
//! ```

use crate::error::{ImageError, Result};
use crate::request::EncodedBody;
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

/// RFC 2046 limit on boundary length.
const MAX_BOUNDARY_LEN: usize = 70;

const MAX_BOUNDARY_ATTEMPTS: usize = 8;

/// A single part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A scalar text field.
    Field {
        /// Form field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// A file upload.
    File {
        /// Form field name.
        name: String,
        /// Filename reported to the server.
        filename: String,
        /// MIME type of `data`.
        content_type: String,
        /// File content.
        data: Bytes,
    },
}

impl Part {
    /// Returns the form field name of this part.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field { name, .. } | Self::File { name, .. } => name,
        }
    }

    fn content(&self) -> &[u8] {
        match self {
            Self::Field { value, .. } => value.as_bytes(),
            Self::File { data, .. } => data,
        }
    }
}

/// An ordered list of parts, encoded on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    parts: Vec<Part>,
}

impl MultipartBody {
    /// Create an empty body.
    #[must_use]
    pub const fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file part.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Returns the parts in encoding order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Encode with a fresh random boundary.
    ///
    /// A boundary that happens to occur inside some part is discarded and a
    /// new one drawn.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Decode`] if no collision-free boundary was found.
    pub fn encode(&self) -> Result<EncodedBody> {
        for _ in 0..MAX_BOUNDARY_ATTEMPTS {
            let boundary = generate_boundary();
            if !self.collides(&boundary) {
                return Ok(self.write(&boundary));
            }
        }
        Err(ImageError::decode(
            "could not find a multipart boundary absent from the body",
        ))
    }

    /// Encode with a caller-chosen boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Decode`] if the boundary is empty, longer than
    /// 70 bytes, contains a character outside ASCII letters, digits and
    /// `'+-._`, or occurs inside any part.
    pub fn encode_with_boundary(&self, boundary: &str) -> Result<EncodedBody> {
        if boundary.is_empty()
            || boundary.len() > MAX_BOUNDARY_LEN
            || !boundary.bytes().all(is_boundary_char)
        {
            return Err(ImageError::decode(format!(
                "invalid multipart boundary {boundary:?}"
            )));
        }
        if self.collides(boundary) {
            return Err(ImageError::decode(format!(
                "multipart boundary {boundary:?} occurs inside the body"
            )));
        }
        Ok(self.write(boundary))
    }

    fn collides(&self, boundary: &str) -> bool {
        let needle = boundary.as_bytes();
        self.parts.iter().any(|part| {
            contains(part.content(), needle)
                || contains(part.name().as_bytes(), needle)
                || matches!(
                    part,
                    Part::File { filename, .. } if contains(filename.as_bytes(), needle)
                )
        })
    }

    fn write(&self, boundary: &str) -> EncodedBody {
        let capacity = self
            .parts
            .iter()
            .map(|part| part.content().len() + boundary.len() + 128)
            .sum::<usize>()
            + boundary.len()
            + 8;
        let mut buf = BytesMut::with_capacity(capacity);

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(CRLF);

            match part {
                Part::Field { name, value } => {
                    buf.put_slice(b"Content-Disposition: form-data; name=\"");
                    buf.put_slice(escape_quoted(name).as_bytes());
                    buf.put_slice(b"\"");
                    buf.put_slice(CRLF);
                    buf.put_slice(CRLF);
                    buf.put_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    buf.put_slice(b"Content-Disposition: form-data; name=\"");
                    buf.put_slice(escape_quoted(name).as_bytes());
                    buf.put_slice(b"\"; filename=\"");
                    buf.put_slice(escape_quoted(filename).as_bytes());
                    buf.put_slice(b"\"");
                    buf.put_slice(CRLF);
                    buf.put_slice(b"Content-Type: ");
                    buf.put_slice(content_type.as_bytes());
                    buf.put_slice(CRLF);
                    buf.put_slice(CRLF);
                    buf.put_slice(data);
                }
            }
            buf.put_slice(CRLF);
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--");
        buf.put_slice(CRLF);

        EncodedBody {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            body: buf.freeze(),
        }
    }
}

/// Characters allowed both by RFC 2046 and in an unquoted header parameter.
const fn is_boundary_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'\'' | b'+' | b'-' | b'.' | b'_')
}

/// Generate a fresh boundary token, `Boundary-<uuid v4>`.
#[must_use]
pub fn generate_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4())
}

/// Percent-encode the characters that would break a quoted header parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle, 0).is_some()
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() || from > haystack.len() - needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Minimal parser for bodies produced by [`MultipartBody`], used to assert on
/// encoded requests in tests.
#[cfg(test)]
pub(crate) fn parse(content_type: &str, body: &[u8]) -> Result<Vec<Part>> {
    let boundary = content_type
        .split_once("boundary=")
        .map(|(_, b)| b)
        .ok_or_else(|| ImageError::decode("missing boundary parameter"))?;
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    if !body.starts_with(delimiter) {
        return Err(ImageError::decode("body does not start with a delimiter"));
    }

    let mut parts = Vec::new();
    let mut cursor = delimiter.len();
    loop {
        let rest = &body[cursor..];
        if rest == b"--\r\n" {
            return Ok(parts);
        }
        if !rest.starts_with(CRLF) {
            return Err(ImageError::decode("delimiter not followed by CRLF"));
        }
        let start = cursor + CRLF.len();
        let next = find(body, delimiter, start)
            .ok_or_else(|| ImageError::decode("unterminated part"))?;
        let segment = body[start..next]
            .strip_suffix(CRLF)
            .ok_or_else(|| ImageError::decode("part not terminated by CRLF"))?;
        parts.push(parse_part(segment)?);
        cursor = next + delimiter.len();
    }
}

#[cfg(test)]
fn parse_part(segment: &[u8]) -> Result<Part> {
    let split = find(segment, b"\r\n\r\n", 0)
        .ok_or_else(|| ImageError::decode("part without header terminator"))?;
    let headers = std::str::from_utf8(&segment[..split])
        .map_err(|e| ImageError::decode(e.to_string()))?;
    let data = Bytes::copy_from_slice(&segment[split + 4..]);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        if let Some(disposition) = line.strip_prefix("Content-Disposition: form-data") {
            for param in disposition.split(';').map(str::trim) {
                if let Some(v) = param.strip_prefix("name=") {
                    name = Some(v.trim_matches('"').to_string());
                } else if let Some(v) = param.strip_prefix("filename=") {
                    filename = Some(v.trim_matches('"').to_string());
                }
            }
        } else if let Some(v) = line.strip_prefix("Content-Type: ") {
            content_type = Some(v.to_string());
        }
    }

    let name = name.ok_or_else(|| ImageError::decode("part without name"))?;
    match (filename, content_type) {
        (Some(filename), Some(content_type)) => Ok(Part::File {
            name,
            filename,
            content_type,
            data,
        }),
        _ => Ok(Part::Field {
            name,
            value: String::from_utf8(data.to_vec()).map_err(|e| ImageError::decode(e.to_string()))?,
        }),
    }
}
