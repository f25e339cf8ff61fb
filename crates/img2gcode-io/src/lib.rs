//! img2gcode-io: the side-effecting half of img2gcode.
//!
//! Wraps the pure `img2gcode-pipeline` and `img2gcode-export` crates
//! with file ingest, settings persistence, the external toolpath
//! translator, and job orchestration.

pub mod convert;
pub mod emit;
pub mod ingest;
pub mod store;
pub mod translator;
pub mod worker;

pub use convert::{Conversion, ConversionJob, ConvertError, Converter};
pub use emit::{EmitError, ToolpathEmitter};
pub use ingest::{IngestError, SUPPORTED_EXTENSIONS};
pub use store::{SettingsStore, StoreError};
pub use translator::{Svg2Gcode, TranslateError, TranslateRequest, Translator};
pub use worker::{JobOutcome, JobWorker, WorkerError};
