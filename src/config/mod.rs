//! Pipeline Configuration
//!
//! Preprocessing, recognition and worker settings stored in TOML format.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OcrError, Result};
use crate::vision::engine::CHAR_WHITELIST;

/// Pipeline settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Image enhancement settings
    pub preprocessing: PreprocessSettings,
    /// Recognition engine settings
    pub recognition: RecognitionSettings,
    /// Worker pool settings
    pub workers: WorkerSettings,
}

/// Interpolation used when upscaling the source photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    /// Bicubic, close to a browser's "high" smoothing quality
    #[default]
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Image enhancement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Integer upscale factor (small printed text needs more pixels)
    pub scale: u32,
    /// Interpolation filter for the upscale
    pub filter: ResizeFilter,
    /// Largest upscaled image accepted, in pixels
    pub max_output_pixels: u64,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            scale: 3,
            filter: ResizeFilter::CatmullRom,
            max_output_pixels: 100_000_000,
        }
    }
}

/// Recognition engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Language hints in priority order (Tesseract codes)
    pub languages: Vec<String>,
    /// Path to the tesseract executable (or a bare name resolved via PATH)
    pub tesseract_path: PathBuf,
    /// Tesseract page segmentation mode (3 = fully automatic)
    pub page_segmentation_mode: u8,
    /// Characters the engine is allowed to emit
    pub char_whitelist: String,
    /// Keep runs of spaces between words
    pub preserve_interword_spaces: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            languages: vec!["vie".to_string(), "eng".to_string()],
            tesseract_path: PathBuf::from("tesseract"),
            page_segmentation_mode: 3,
            char_whitelist: CHAR_WHITELIST.to_string(),
            preserve_interword_spaces: true,
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Maximum number of concurrent recognition runs
    pub max_workers: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { max_workers: 2 }
    }
}

/// Get the default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "cavet", "cavet-ocr")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| OcrError::config_with_source(format!("failed to read {}", path.display()), e))?;
    let config: PipelineConfig = toml::from_str(&content)
        .map_err(|e| OcrError::config_with_source(format!("failed to parse {}", path.display()), e))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &PipelineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| OcrError::config_with_source("failed to serialize configuration", e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OcrError::config_with_source(format!("failed to create {}", parent.display()), e)
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| OcrError::config_with_source(format!("failed to write {}", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();

        assert_eq!(config.preprocessing.scale, 3);
        assert_eq!(config.preprocessing.filter, ResizeFilter::CatmullRom);

        assert_eq!(config.recognition.languages, vec!["vie", "eng"]);
        assert_eq!(config.recognition.page_segmentation_mode, 3);
        assert!(config.recognition.preserve_interword_spaces);
        assert!(config.recognition.char_whitelist.contains('Đ'));

        assert_eq!(config.workers.max_workers, 2);
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = PipelineConfig::default();
        config.preprocessing.scale = 2;
        config.preprocessing.filter = ResizeFilter::Lanczos3;
        config.recognition.tesseract_path = PathBuf::from("/opt/tesseract/bin/tesseract");

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: PipelineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.preprocessing.scale, 2);
        assert_eq!(parsed.preprocessing.filter, ResizeFilter::Lanczos3);
        assert_eq!(
            parsed.recognition.tesseract_path,
            PathBuf::from("/opt/tesseract/bin/tesseract")
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: PipelineConfig = toml::from_str("[workers]\nmax_workers = 4\n").unwrap();

        assert_eq!(parsed.workers.max_workers, 4);
        assert_eq!(parsed.preprocessing.scale, 3);
        assert_eq!(parsed.recognition.languages, vec!["vie", "eng"]);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = PipelineConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config.preprocessing.scale, loaded.preprocessing.scale);
        assert_eq!(config.recognition.char_whitelist, loaded.recognition.char_whitelist);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(OcrError::Config { .. })));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
