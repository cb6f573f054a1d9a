//! Extraction pipeline
//!
//! photo → preprocess → recognize → extract fields → assemble. Each call is
//! independent; the only shared state is the recognition worker pool.

use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{OcrError, Result};
use crate::extraction::{ExtractedFields, FieldSource, RuleSet};
use crate::result::OcrResult;
use crate::vision::engine::{clamp_confidence, LanguageHints, Recognition, RecognitionEngine};
use crate::vision::input::ImageInput;
use crate::vision::pool::EnginePool;
use crate::vision::preprocess::{self, PreparedImage};
use crate::vision::progress::ProgressReporter;

/// Merge extracted fields with the recognition output.
///
/// Values are copied as-is; fields produced by fallback rules are listed in
/// `heuristic_fields`.
pub fn assemble(fields: ExtractedFields, recognition: Recognition) -> OcrResult {
    let mut result = OcrResult {
        raw_text: recognition.text,
        confidence: clamp_confidence(recognition.confidence),
        ..Default::default()
    };

    for (field, extracted) in fields {
        if extracted.source == FieldSource::Heuristic {
            result.heuristic_fields.push(field);
        }
        result.set(field, Some(extracted.value));
    }

    result
}

/// Registration certificate reader
pub struct OcrPipeline<E> {
    config: PipelineConfig,
    languages: LanguageHints,
    rules: RuleSet,
    pool: EnginePool<E>,
}

impl<E: RecognitionEngine> OcrPipeline<E> {
    /// Create a pipeline over a fixed set of recognition workers
    pub fn new(config: PipelineConfig, engines: Vec<E>) -> Result<Self> {
        let languages = LanguageHints::new(config.recognition.languages.iter().cloned());
        let pool = EnginePool::new(engines)?;

        info!(
            "OCR pipeline ready: {} worker(s), languages {}",
            pool.size(),
            languages
        );

        Ok(Self {
            config,
            languages,
            rules: RuleSet::vehicle_registration(),
            pool,
        })
    }

    /// Replace the extraction rules
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn pool(&self) -> &EnginePool<E> {
        &self.pool
    }

    /// Read one photo
    pub async fn extract(
        &self,
        input: impl Into<ImageInput>,
        progress: &ProgressReporter,
    ) -> Result<OcrResult> {
        self.extract_with_cancel(input, progress, &CancellationToken::new())
            .await
    }

    /// Read one photo, abandoning the run when `cancel` fires.
    ///
    /// A cancelled call returns `OcrError::Cancelled` and never a partial
    /// result; the recognition worker goes back to the pool either way.
    pub async fn extract_with_cancel(
        &self,
        input: impl Into<ImageInput>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<OcrResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("extract", %request_id);
        self.run(input.into(), progress, cancel).instrument(span).await
    }

    async fn run(
        &self,
        input: ImageInput,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<OcrResult> {
        let start = Instant::now();
        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }
        // Each call reports its own 0..100, even on a reused reporter
        progress.begin();

        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            prepared = self.preprocess(input) => prepared?,
        };

        let recognition = self.recognize(&prepared, progress, cancel).await?;

        // Anything that finished after a cancel is discarded
        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }

        let fields = self.rules.extract(&recognition.text);
        let result = assemble(fields, recognition);
        progress.report(100);

        info!(
            "Extracted {}/8 fields ({} heuristic, confidence {:.1}) in {:?}",
            result.present_fields().len(),
            result.heuristic_fields.len(),
            result.confidence,
            start.elapsed()
        );

        Ok(result)
    }

    /// Pixel work runs off the async runtime
    async fn preprocess(&self, input: ImageInput) -> Result<PreparedImage> {
        let settings = self.config.preprocessing.clone();
        tokio::task::spawn_blocking(move || preprocess::prepare(input.as_bytes(), &settings))
            .await
            .map_err(|e| OcrError::image_decode_with_source("preprocessing task failed", e))?
    }

    async fn recognize(
        &self,
        image: &PreparedImage,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Recognition> {
        let engine = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            engine = self.pool.acquire() => engine?,
        };

        progress.report(0);
        debug!("Recognizing with {}", engine.name());

        // Dropping the engine future abandons the run; the guard returns the worker
        let recognition = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Recognition cancelled");
                Err(OcrError::Cancelled)
            }
            recognition = engine.recognize(image, &self.languages, progress) => recognition,
        };
        drop(engine);
        recognition
    }
}
