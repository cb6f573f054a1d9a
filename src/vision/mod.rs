//! Vision Layer
//!
//! Image preparation and text recognition. The recognition backend sits
//! behind [`RecognitionEngine`]; the shipped backend drives the Tesseract
//! command-line tool.

pub mod engine;
pub mod input;
pub mod pool;
pub mod preprocess;
pub mod progress;
pub mod tesseract;

pub use engine::{LanguageHints, Recognition, RecognitionEngine, CHAR_WHITELIST};
pub use input::ImageInput;
pub use pool::{EnginePool, PooledEngine};
pub use preprocess::{prepare, AdaptiveParams, PreparedImage};
pub use progress::{ProgressCallback, ProgressReporter};
pub use tesseract::{parse_tsv, TesseractCli};
