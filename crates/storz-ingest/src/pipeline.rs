//! Per-file pipeline
//!
//! One file's journey: stage plaintext → encrypt → submit ciphertext →
//! record metadata → cleanup. Stages are strictly sequential within a file;
//! every error is caught at the pipeline boundary and becomes that file's
//! result entry, never a reason to abort a sibling.

use crate::spool::Spool;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use storz_cas::{CasError, ContentStore};
use storz_core::models::{FileRecord, UploadedFile, UserContext};
use storz_crypto::CryptoError;
use storz_directory::{DirectoryError, UserDirectory};

/// Failure of a single file's pipeline. Scoped to that file only.
#[derive(Debug, thiserror::Error)]
pub enum PerFileError {
    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("Encryption failed: {0}")]
    Encryption(#[from] CryptoError),

    #[error("Submission failed: {0}")]
    Submission(#[from] CasError),

    #[error("Recording failed: {0}")]
    Recording(#[from] DirectoryError),

    #[error("Timed out after {0} seconds")]
    TimedOut(u64),

    #[error("Pipeline task failed: {0}")]
    Internal(String),
}

impl PerFileError {
    /// Machine-readable code for the batch response.
    pub fn code(&self) -> &'static str {
        match self {
            PerFileError::Staging(_) => "STAGING_FAILED",
            PerFileError::Encryption(_) => "ENCRYPTION_FAILED",
            PerFileError::Submission(_) => "SUBMISSION_FAILED",
            PerFileError::Recording(_) => "RECORDING_FAILED",
            PerFileError::TimedOut(_) => "TIMED_OUT",
            PerFileError::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the caller may usefully retry this file.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PerFileError::Submission(CasError::Unavailable(_))
                | PerFileError::Recording(DirectoryError::Unavailable(_))
                | PerFileError::TimedOut(_)
        )
    }
}

/// Terminal state of one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub outcome: Result<FileRecord, PerFileError>,
}

/// One entry per input file, in input order, each independently terminal.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub entries: Vec<FileOutcome>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }
}

/// Run one file's pipeline to a terminal state.
///
/// The deadline covers encrypt/submit/record; cleanup runs after the outcome
/// is decided, on success, failure, and timeout alike.
pub(crate) async fn run_file(
    store: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
    spool: Spool,
    ctx: UserContext,
    file: UploadedFile,
    per_file_timeout: Duration,
) -> FileOutcome {
    let file_name = file.name.clone();
    let start = std::time::Instant::now();

    let staged = match spool.stage(&file.name, &file.content).await {
        Ok(staged) => staged,
        Err(e) => {
            tracing::error!(file_name = %file_name, error = %e, "Failed to stage upload");
            return FileOutcome {
                file_name,
                outcome: Err(PerFileError::Staging(e.to_string())),
            };
        }
    };

    let outcome = match tokio::time::timeout(
        per_file_timeout,
        run_stages(&store, &directory, &ctx, &file.name, &staged),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(PerFileError::TimedOut(per_file_timeout.as_secs())),
    };

    spool.cleanup(&staged).await;

    match &outcome {
        Ok(record) => tracing::info!(
            file_name = %file_name,
            cid = %record.cid,
            size_bytes = record.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File ingested"
        ),
        Err(e) => tracing::warn!(
            file_name = %file_name,
            error = %e,
            error_code = e.code(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File ingestion failed"
        ),
    }

    FileOutcome { file_name, outcome }
}

async fn run_stages(
    store: &Arc<dyn ContentStore>,
    directory: &Arc<dyn UserDirectory>,
    ctx: &UserContext,
    file_name: &str,
    staged: &crate::spool::TransientFile,
) -> Result<FileRecord, PerFileError> {
    storz_crypto::encrypt_file(&staged.plaintext, &staged.ciphertext, &ctx.key).await?;

    let sealed = tokio::fs::read(&staged.ciphertext)
        .await
        .map_err(|e| PerFileError::Internal(format!("failed to read back ciphertext: {}", e)))?;

    let receipt = store.put(file_name, sealed.into()).await?;

    // The record is appended only after the store has accepted the blob; the
    // receipt's size and name are authoritative.
    let record = FileRecord {
        file_name: receipt.stored_name.clone(),
        public: false,
        cid: receipt.cid.clone(),
        created_at: Utc::now(),
        size: receipt.size,
    };

    directory.append_file_record(&ctx.issuer_id, &record).await?;

    Ok(record)
}
