//! Recognition engine interface
//!
//! The pipeline only needs `recognize(image, languages, progress) -> (text, confidence)`.
//! Concrete engines (Tesseract, test stubs) implement [`RecognitionEngine`].

use async_trait::async_trait;
use std::fmt;

use super::preprocess::PreparedImage;
use super::progress::ProgressReporter;
use crate::error::Result;

/// Characters the engine may emit: Latin letters, digits, Vietnamese
/// diacritic letters (both cases), space and `/:()-.,`
pub const CHAR_WHITELIST: &str = concat!(
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789",
    "ÀÁẢÃẠĂẰẮẲẴẶÂẦẤẨẪẬÈÉẺẼẸÊỀẾỂỄỆÌÍỈĨỊÒÓỎÕỌÔỒỐỔỖỘƠỜỚỞỠỢÙÚỦŨỤƯỪỨỬỮỰỲÝỶỸỴĐ",
    "àáảãạăằắẳẵặâầấẩẫậèéẻẽẹêềếểễệìíỉĩịòóỏõọôồốổỗộơờớởỡợùúủũụưừứửữựỳýỷỹỵđ",
    " /:()-.,"
);

/// Ordered set of language hints (Tesseract language codes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageHints {
    languages: Vec<String>,
}

impl LanguageHints {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages
                .into_iter()
                .map(Into::<String>::into)
                .filter(|l| !l.trim().is_empty())
                .collect(),
        }
    }

    /// Vietnamese first, English second
    pub fn vietnamese_english() -> Self {
        Self::new(["vie", "eng"])
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Render as `vie+eng`
    pub fn joined(&self) -> String {
        self.languages.join("+")
    }
}

impl Default for LanguageHints {
    fn default() -> Self {
        Self::vietnamese_english()
    }
}

impl fmt::Display for LanguageHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Raw recognition output
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Recognized text, lines separated by `\n`
    pub text: String,
    /// Average per-character certainty (0-100)
    pub confidence: f32,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

/// Clamp a confidence into [0, 100], mapping NaN to 0
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 100.0)
    }
}

/// Text recognition backend
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Engine identifier used in logs
    fn name(&self) -> &'static str;

    /// Recognize text in a prepared image.
    ///
    /// Implementations report progress through `progress` and must fail with
    /// `OcrError::EngineUnavailable` if the engine cannot start or crashes.
    /// Dropping the returned future must abandon the run.
    async fn recognize(
        &self,
        image: &PreparedImage,
        languages: &LanguageHints,
        progress: &ProgressReporter,
    ) -> Result<Recognition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_hints_joined() {
        assert_eq!(LanguageHints::default().joined(), "vie+eng");
        assert_eq!(LanguageHints::new(["eng", " ", "jpn"]).joined(), "eng+jpn");
        assert_eq!(LanguageHints::vietnamese_english().to_string(), "vie+eng");
    }

    #[test]
    fn test_whitelist_contents() {
        for c in ['A', 'z', '0', '9', 'Đ', 'đ', 'ự', 'Ỹ', '/', ':', '(', ')', '-', '.', ',', ' '] {
            assert!(CHAR_WHITELIST.contains(c), "missing {:?}", c);
        }
        for c in ['@', '#', '_', '|', '\n'] {
            assert!(!CHAR_WHITELIST.contains(c), "unexpected {:?}", c);
        }
    }

    #[test]
    fn test_recognition_clamps_confidence() {
        assert_eq!(Recognition::new("x", 140.0).confidence, 100.0);
        assert_eq!(Recognition::new("x", -3.0).confidence, 0.0);
        assert_eq!(Recognition::new("x", f32::NAN).confidence, 0.0);
        assert_eq!(Recognition::new("x", 87.5).confidence, 87.5);
    }
}
