use async_trait::async_trait;
use bytes::Bytes;

/// Content store operation errors
#[derive(Debug, thiserror::Error)]
pub enum CasError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Content rejected: {0}")]
    Rejected(String),

    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

/// Result type for content store operations
pub type CasResult<T> = Result<T, CasError>;

/// Receipt confirming durable acceptance of a blob.
///
/// `size` is the store's own accounting and is authoritative for metadata
/// records; it is not assumed equal to the submitted byte length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReceipt {
    pub cid: String,
    pub size: u64,
    pub stored_name: String,
}

/// Content-addressed storage abstraction.
///
/// Identical bytes map to the same content identifier, so resubmitting the
/// same blob is safe and cheap. Implementations do not deduplicate before
/// sending; the network handles that by construction.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Submit named byte content and obtain a receipt.
    async fn put(&self, name: &str, data: Bytes) -> CasResult<ContentReceipt>;
}
