//! Error types for the extraction pipeline.
//!
//! Only hard failures are errors: the photo could not be decoded, or the
//! recognition engine could not run. A field that fails to match is not an
//! error; it is simply absent from the result.

use thiserror::Error;

/// Message shown to the user for any hard failure of the pipeline.
pub const USER_FACING_FAILURE: &str =
    "Could not read the photo. Please retry with a clearer image.";

/// Result type alias using [`OcrError`].
pub type Result<T> = std::result::Result<T, OcrError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the OCR pipeline
#[derive(Debug, Error)]
pub enum OcrError {
    /// Input bytes are not a decodable image (or are empty / oversized)
    #[error("Image decode error: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The enhanced image could not be re-encoded
    #[error("Image encode error: {message}")]
    ImageEncode {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Recognition engine failed to start or crashed mid-run
    #[error("Recognition engine unavailable: {message}")]
    EngineUnavailable {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The caller cancelled the extraction
    #[error("Extraction cancelled")]
    Cancelled,

    /// A user-supplied extraction rule has an invalid regex
    #[error("Invalid extraction pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl OcrError {
    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecode {
            message: message.into(),
            source: None,
        }
    }

    pub fn image_decode_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ImageDecode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn image_encode_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ImageEncode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn engine_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Text to show the user for this failure.
    ///
    /// Decode, encode and engine failures all collapse into the same message
    /// so the UI can offer one "retry with a new photo" prompt.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ImageDecode { .. } | Self::ImageEncode { .. } | Self::EngineUnavailable { .. } => {
                USER_FACING_FAILURE
            }
            Self::Cancelled => "Photo reading was cancelled.",
            Self::InvalidPattern(_) | Self::Config { .. } => {
                "The document reader is misconfigured."
            }
        }
    }

    /// Whether this error came from the input photo or the recognition run
    /// rather than from programming or configuration mistakes.
    pub fn is_recoverable_by_new_photo(&self) -> bool {
        matches!(
            self,
            Self::ImageDecode { .. } | Self::ImageEncode { .. } | Self::EngineUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_hard_failures_share_user_message() {
        let decode = OcrError::image_decode("truncated PNG");
        let engine = OcrError::engine_unavailable("tesseract exited with status 1");

        assert_eq!(decode.user_message(), USER_FACING_FAILURE);
        assert_eq!(engine.user_message(), USER_FACING_FAILURE);
        assert!(decode.is_recoverable_by_new_photo());
        assert!(!OcrError::Cancelled.is_recoverable_by_new_photo());
    }

    #[test]
    fn test_source_chain_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = OcrError::engine_unavailable_with_source("failed to spawn tesseract", io);

        assert!(err.to_string().contains("failed to spawn tesseract"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_pattern_from_regex() {
        let err: OcrError = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(matches!(err, OcrError::InvalidPattern(_)));
    }
}
