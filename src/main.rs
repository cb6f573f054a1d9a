//! cavet-ocr - read a registration certificate photo from the command line
//!
//! Prints the extracted fields as JSON on stdout; progress and logs go to
//! stderr. Ctrl-C cancels the run.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cavet_ocr::config::{self, PipelineConfig};
use cavet_ocr::{ImageInput, OcrError, OcrPipeline, ProgressReporter, TesseractCli};

/// cavet-ocr - Vietnamese vehicle registration certificate reader
#[derive(Parser, Debug)]
#[command(name = "cavet-ocr")]
#[command(about = "Extract structured fields from a vehicle registration certificate photo")]
struct Args {
    /// Photo to read (JPEG or PNG)
    #[arg(required_unless_present = "write_default_config")]
    image: Option<PathBuf>,

    /// The file holds a data:image/...;base64 URL instead of image bytes
    #[arg(long)]
    data_url: bool,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_default_config: bool,

    /// Pretty-print the JSON result
    #[arg(short, long)]
    pretty: bool,

    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays pure JSON
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.write_default_config {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => config::default_config_path().context("could not determine config directory")?,
        };
        config::save_config(&PipelineConfig::default(), &path)?;
        info!("Wrote default configuration to {:?}", path);
        return Ok(());
    }

    let config = load_or_default_config(args.config.as_deref())?;
    let Some(image_path) = args.image else {
        anyhow::bail!("no image given");
    };

    let workers = config.workers.max_workers.max(1);
    let engines: Vec<TesseractCli> = (0..workers)
        .map(|_| TesseractCli::new(config.recognition.clone()))
        .collect();

    if let Err(e) = engines[0].probe().await {
        eprintln!("{}", e.user_message());
        return Err(e).context("tesseract is not usable");
    }

    let input = read_input(&image_path, args.data_url)?;
    let pipeline = OcrPipeline::new(config, engines)?;

    let progress = ProgressReporter::from_callback(|percent| {
        eprint!("\rReading photo... {:>3}%", percent);
        let _ = std::io::stderr().flush();
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    let outcome = pipeline.extract_with_cancel(input, &progress, &cancel).await;
    eprintln!();

    match outcome {
        Ok(result) => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            if let Some(prompt) = retry_prompt(&e) {
                eprintln!("{}", prompt);
            }
            Err(e).with_context(|| format!("failed to read {:?}", image_path))
        }
    }
}

/// Friendly retry prompt for failures a new photo can fix. Other failures
/// are only reported through the error chain.
fn retry_prompt(error: &OcrError) -> Option<&'static str> {
    error
        .is_recoverable_by_new_photo()
        .then(|| error.user_message())
}

/// Load the given config file, or the per-user one if it exists, or defaults
fn load_or_default_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Some(path) = config::default_config_path() {
        if path.exists() {
            let config = config::load_config(&path)?;
            info!("Loaded configuration from {:?}", path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(PipelineConfig::default())
}

fn read_input(path: &Path, data_url: bool) -> Result<ImageInput> {
    if data_url {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read data URL from {:?}", path))?;
        Ok(ImageInput::from_data_url(&text)?)
    } else {
        let bytes = std::fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
        Ok(ImageInput::from_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cavet_ocr::error::USER_FACING_FAILURE;

    #[test]
    fn test_retry_prompt_only_for_photo_failures() {
        let decode = OcrError::image_decode("truncated PNG");
        assert_eq!(retry_prompt(&decode), Some(USER_FACING_FAILURE));

        let engine = OcrError::engine_unavailable("tesseract exited with status 1");
        assert_eq!(retry_prompt(&engine), Some(USER_FACING_FAILURE));

        assert_eq!(retry_prompt(&OcrError::Cancelled), None);
        let config = OcrError::config_with_source("bad toml", std::fmt::Error);
        assert_eq!(retry_prompt(&config), None);
    }
}
