//! cavet-ocr - Vietnamese vehicle registration certificate reader
//!
//! Turns a photo of a registration certificate ("cà vẹt") into structured
//! fields: VIN, engine number, plate, brand, color, owner, address and
//! registration date. Fields that cannot be read are left empty, never
//! guessed.

pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod result;
pub mod vision;

pub use config::PipelineConfig;
pub use error::{OcrError, Result};
pub use extraction::{Field, FieldSource, Rule, RuleSet};
pub use pipeline::{assemble, OcrPipeline};
pub use result::OcrResult;
pub use vision::{ImageInput, ProgressReporter, RecognitionEngine, TesseractCli};
