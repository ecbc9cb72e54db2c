use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use super::extractor::extract_record;
use super::types::{
    Batch, CandidateFile, ExifRecord, ExtractionStatus, FileStatus, ProgressEvent,
};

/// Files are read in bounded chunks so one large file never holds the
/// cooperative scheduler between await points.
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No valid JPG/JPEG files selected.")]
    NoAcceptedFiles,

    #[error("file processing aborted before completion ({completed}/{total})")]
    Aborted { completed: usize, total: usize },
}

/// Tracks one batch to completion. `record` appends exactly one record and
/// increments exactly once per call; it returns `true` on the single call
/// that completes the batch, and never again. All calls happen on one
/// aggregation task, so increment-then-compare cannot interleave.
pub struct BatchTracker {
    total: usize,
    records: Batch,
    fired: bool,
}

impl BatchTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            records: Vec::with_capacity(total),
            fired: false,
        }
    }

    pub fn record(&mut self, record: ExifRecord) -> bool {
        self.records.push(record);
        if self.records.len() >= self.total && !self.fired {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn completed(&self) -> usize {
        self.records.len()
    }

    pub fn is_complete(&self) -> bool {
        self.fired
    }

    pub fn into_batch(self) -> Batch {
        self.records
    }
}

/// The batch ingestion pipeline: filters candidates, reads and extracts each
/// accepted file on its own task, and aggregates the records into one batch.
pub struct BatchProcessor {
    whitelist: Arc<Vec<String>>,
}

impl BatchProcessor {
    pub fn new(whitelist: Vec<String>) -> Self {
        Self {
            whitelist: Arc::new(whitelist),
        }
    }

    /// Ordered subset of candidates with an accepted media type. Rejected
    /// files are logged and dropped; an empty result aborts the submission.
    pub fn accept(&self, candidates: Vec<CandidateFile>) -> Result<Vec<CandidateFile>, PipelineError> {
        let accepted = filter_accepted(candidates);
        if accepted.is_empty() {
            return Err(PipelineError::NoAcceptedFiles);
        }
        Ok(accepted)
    }

    /// Read and extract every accepted file. Per-file tasks are spawned on
    /// the current thread's `LocalSet` and complete in any order; the single
    /// aggregation loop below is the only place the progress counter and the
    /// batch are touched. Must be called from within a `LocalSet`.
    pub async fn process_files(
        &self,
        files: Vec<CandidateFile>,
        events: &Sender<ProgressEvent>,
    ) -> Result<Batch, PipelineError> {
        let total = files.len();
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

        for file in files {
            let done_tx = done_tx.clone();
            let whitelist = Arc::clone(&self.whitelist);
            tokio::task::spawn_local(async move {
                let outcome = process_one(file, &whitelist).await;
                // Receiver hang-up means the batch already failed; nothing
                // left to report.
                let _ = done_tx.send(outcome);
            });
        }
        drop(done_tx);

        let mut tracker = BatchTracker::new(total);
        while let Some(outcome) = done_rx.recv().await {
            let status = outcome.status();
            let finished = tracker.record(outcome.record);
            tracing::debug!(
                file = %status.name,
                completed = tracker.completed(),
                total,
                "file processed"
            );
            let _ = events.send(ProgressEvent::FileDone(status));
            if finished {
                break;
            }
        }

        if !tracker.is_complete() {
            return Err(PipelineError::Aborted {
                completed: tracker.completed(),
                total,
            });
        }
        Ok(tracker.into_batch())
    }
}

pub fn filter_accepted(candidates: Vec<CandidateFile>) -> Vec<CandidateFile> {
    candidates
        .into_iter()
        .filter(|file| {
            if file.is_accepted() {
                true
            } else {
                tracing::warn!("Skipping non-JPEG file: {}", file.name);
                false
            }
        })
        .collect()
}

struct FileOutcome {
    name: String,
    size: u64,
    record: ExifRecord,
}

impl FileOutcome {
    fn status(&self) -> FileStatus {
        let status = match &self.record.error {
            Some(error) => ExtractionStatus::Failed(error.clone()),
            None => ExtractionStatus::Extracted {
                field_count: self.record.fields.len(),
            },
        };
        FileStatus {
            name: self.name.clone(),
            size: self.size,
            status,
        }
    }
}

/// One file's read-and-extract attempt. Every path returns a record, so the
/// aggregation loop appends and increments unconditionally per file.
async fn process_one(file: CandidateFile, whitelist: &[String]) -> FileOutcome {
    match read_file_bytes(&file.path).await {
        Ok(bytes) => {
            let record = extract_record(&bytes, whitelist);
            if let Some(error) = &record.error {
                tracing::warn!("Could not read EXIF for {}: {}", file.name, error);
            }
            FileOutcome {
                size: bytes.len() as u64,
                record,
                name: file.name,
            }
        }
        Err(err) => {
            tracing::warn!("Error reading file {}: {}", file.name, err);
            FileOutcome {
                size: file.size,
                record: ExifRecord::read_error(file.name.clone()),
                name: file.name,
            }
        }
    }
}

async fn read_file_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}
