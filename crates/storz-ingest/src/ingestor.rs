//! Ingestion orchestrator
//!
//! Fans a batch out into independent per-file pipelines, bounded by a
//! concurrency limit, and waits for every one of them to reach a terminal
//! state before reporting. Pipelines run on spawned tasks, so a caller that
//! drops mid-batch does not abandon in-flight encryption or lose metadata.

use crate::pipeline::{self, BatchResult, FileOutcome, PerFileError};
use crate::spool::Spool;
use std::sync::Arc;
use std::time::Duration;
use storz_cas::ContentStore;
use storz_core::models::{UploadedFile, UserContext};
use storz_directory::UserDirectory;
use tokio::sync::Semaphore;

/// Bounds on batch processing.
#[derive(Debug, Clone)]
pub struct IngestLimits {
    /// Per-file pipelines allowed to run at once within a batch.
    pub max_concurrent_files: usize,
    /// Deadline for one file's encrypt/submit/record sequence.
    pub per_file_timeout: Duration,
}

impl Default for IngestLimits {
    fn default() -> Self {
        IngestLimits {
            max_concurrent_files: 4,
            per_file_timeout: Duration::from_secs(120),
        }
    }
}

/// Batch ingestion orchestrator.
///
/// Holds its collaborators as injected dependencies with process-scoped
/// lifetime; nothing here is an ambient singleton.
pub struct Ingestor {
    store: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
    spool: Spool,
    limits: IngestLimits,
    semaphore: Arc<Semaphore>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        directory: Arc<dyn UserDirectory>,
        spool: Spool,
        limits: IngestLimits,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(limits.max_concurrent_files));
        Ingestor {
            store,
            directory,
            spool,
            limits,
            semaphore,
        }
    }

    /// Ingest a batch of files for one authenticated user.
    ///
    /// Every input file gets exactly one entry in the result, in input order,
    /// regardless of individual failures or completion order. The future
    /// resolves only after all per-file pipelines are terminal.
    pub async fn ingest(&self, ctx: &UserContext, files: Vec<UploadedFile>) -> BatchResult {
        let batch_size = files.len();
        let start = std::time::Instant::now();

        let mut handles = Vec::with_capacity(batch_size);
        for file in files {
            let store = Arc::clone(&self.store);
            let directory = Arc::clone(&self.directory);
            let spool = self.spool.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let ctx = ctx.clone();
            let timeout = self.limits.per_file_timeout;
            let file_name = file.name.clone();

            // Spawned (not merely polled) so pipelines survive a dropped
            // caller and run to completion.
            let handle = tokio::spawn(async move {
                // The semaphore is never closed; acquisition only fails then.
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline::run_file(store, directory, spool, ctx, file, timeout).await
            });
            handles.push((file_name, handle));
        }

        let mut entries = Vec::with_capacity(batch_size);
        for (file_name, handle) in handles {
            match handle.await {
                Ok(outcome) => entries.push(outcome),
                Err(e) => {
                    tracing::error!(file_name = %file_name, error = %e, "Pipeline task panicked");
                    entries.push(FileOutcome {
                        file_name,
                        outcome: Err(PerFileError::Internal(e.to_string())),
                    });
                }
            }
        }

        let result = BatchResult { entries };
        tracing::info!(
            issuer_id = %ctx.issuer_id,
            batch_size,
            succeeded = result.succeeded(),
            failed = result.failed(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch ingestion complete"
        );
        result
    }
}
