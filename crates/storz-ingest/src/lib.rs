//! Secure file-ingestion pipeline
//!
//! Takes a batch of uploaded files for one authenticated user through
//! encrypt → submit → record → cleanup, one independent unit of work per
//! file. The orchestrator awaits every per-file pipeline before the batch is
//! considered complete, so callers are never told about work that has not
//! actually happened.

mod ingestor;
mod pipeline;
mod spool;

pub use ingestor::{IngestLimits, Ingestor};
pub use pipeline::{BatchResult, FileOutcome, PerFileError};
pub use spool::{Spool, TransientFile};
