//! Image input accepted by the pipeline
//!
//! The portal hands photos around either as raw file bytes (file picker,
//! camera capture) or as `data:` URLs produced by a browser canvas.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{OcrError, Result};

/// Encoded image supplied by the caller
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Vec<u8>,
}

impl ImageInput {
    /// Wrap raw JPEG/PNG bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Parse a `data:image/<type>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| OcrError::image_decode("not a data URL"))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| OcrError::image_decode("data URL has no payload"))?;

        if !header.starts_with("image/") {
            return Err(OcrError::image_decode(format!(
                "data URL is not an image (media type '{}')",
                header
            )));
        }
        if !header.ends_with(";base64") {
            return Err(OcrError::image_decode("data URL payload is not base64"));
        }

        // Browsers may wrap long payloads
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| OcrError::image_decode_with_source("invalid base64 payload", e))?;

        Ok(Self { bytes })
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the encoded image in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes.to_vec())
    }
}
