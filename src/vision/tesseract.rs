//! Tesseract command-line backend
//!
//! Runs the `tesseract` executable on the enhanced image and parses its TSV
//! output. The child process is killed if the recognition future is dropped,
//! which is how a cancelled extraction releases its worker.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use super::engine::{LanguageHints, Recognition, RecognitionEngine};
use super::preprocess::PreparedImage;
use super::progress::ProgressReporter;
use crate::config::RecognitionSettings;
use crate::error::{OcrError, Result};

/// A single recognized word with its confidence
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f32,
}

/// A line of recognized words
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub words: Vec<RecognizedWord>,
}

impl RecognizedLine {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parsed TSV page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedPage {
    pub lines: Vec<RecognizedLine>,
}

impl RecognizedPage {
    /// Page text, one output line per recognized line
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(RecognizedLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mean word confidence (0 when nothing was recognized)
    pub fn confidence(&self) -> f32 {
        let (sum, count) = self
            .lines
            .iter()
            .flat_map(|l| l.words.iter())
            .fold((0.0f32, 0usize), |(sum, count), w| (sum + w.confidence, count + 1));

        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

/// Parses Tesseract TSV output into lines of words
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
///             left, top, width, height, conf, text
pub fn parse_tsv(tsv: &str) -> RecognizedPage {
    let mut lines: Vec<RecognizedLine> = Vec::new();
    let mut current_key: Option<(i32, i32, i32, i32)> = None;
    let mut current_words: Vec<RecognizedWord> = Vec::new();

    // Skip header
    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // Level 5 = word
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let key = (
            fields[1].parse().unwrap_or(-1),
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let confidence: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        if current_key.is_some_and(|k| k != key) && !current_words.is_empty() {
            lines.push(RecognizedLine {
                words: std::mem::take(&mut current_words),
            });
        }
        current_key = Some(key);

        current_words.push(RecognizedWord {
            text: text.to_string(),
            confidence,
        });
    }

    // Don't forget the last line
    if !current_words.is_empty() {
        lines.push(RecognizedLine {
            words: current_words,
        });
    }

    RecognizedPage { lines }
}

/// Tesseract executable wrapper
#[derive(Debug, Clone)]
pub struct TesseractCli {
    settings: RecognitionSettings,
}

impl TesseractCli {
    pub fn new(settings: RecognitionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    /// Check that the executable runs; returns its version line
    pub async fn probe(&self) -> Result<String> {
        let output = Command::new(&self.settings.tesseract_path)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(OcrError::engine_unavailable(format!(
                "{} --version exited with {}",
                self.settings.tesseract_path.display(),
                output.status
            )));
        }

        // Older releases print the version to stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let version = stdout
            .lines()
            .chain(stderr.lines())
            .find(|l| !l.trim().is_empty())
            .unwrap_or("tesseract")
            .trim()
            .to_string();

        info!("Tesseract available: {}", version);
        Ok(version)
    }

    /// Command-line arguments for one recognition run
    fn build_args(&self, input: &Path, languages: &LanguageHints) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            languages.joined().into(),
            "--psm".into(),
            self.settings.page_segmentation_mode.to_string().into(),
        ];

        if !self.settings.char_whitelist.is_empty() {
            args.push("-c".into());
            args.push(format!("tessedit_char_whitelist={}", self.settings.char_whitelist).into());
        }
        if self.settings.preserve_interword_spaces {
            args.push("-c".into());
            args.push("preserve_interword_spaces=1".into());
        }

        // Output TSV format
        args.push("tsv".into());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        let message = if e.kind() == std::io::ErrorKind::NotFound {
            format!(
                "tesseract executable not found at '{}'",
                self.settings.tesseract_path.display()
            )
        } else {
            format!("failed to run '{}'", self.settings.tesseract_path.display())
        };
        OcrError::engine_unavailable_with_source(message, e)
    }
}

#[async_trait]
impl RecognitionEngine for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(
        &self,
        image: &PreparedImage,
        languages: &LanguageHints,
        progress: &ProgressReporter,
    ) -> Result<Recognition> {
        let start = Instant::now();
        progress.report(0);

        // Save image to temporary file
        let mut input = NamedTempFile::with_suffix(".png")
            .map_err(|e| OcrError::engine_unavailable_with_source("failed to create temp file", e))?;
        input
            .write_all(&image.png)
            .and_then(|_| input.flush())
            .map_err(|e| OcrError::engine_unavailable_with_source("failed to write temp image", e))?;
        progress.report(10);

        let args = self.build_args(input.path(), languages);
        debug!("Running tesseract with {} ({}x{})", languages, image.width, image.height);

        let output = Command::new(&self.settings.tesseract_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::engine_unavailable(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        progress.report(90);

        let tsv = String::from_utf8(output.stdout)
            .map_err(|e| OcrError::engine_unavailable_with_source("tesseract produced invalid UTF-8", e))?;
        let page = parse_tsv(&tsv);
        let recognition = Recognition::new(page.text(), page.confidence());

        debug!(
            "Tesseract recognized {} lines (confidence {:.1}) in {:?}",
            page.lines.len(),
            recognition.confidence,
            start.elapsed()
        );
        progress.report(95);

        Ok(recognition)
    }
}
