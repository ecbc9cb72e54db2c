mod extractor;
mod processor;
mod types;

pub use processor::{BatchProcessor, PipelineError};
pub use types::{CandidateFile, ExifRecord, ExtractionStatus, FileStatus, ProgressEvent};
