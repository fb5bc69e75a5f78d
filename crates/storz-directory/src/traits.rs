use async_trait::async_trait;
use storz_core::models::{FileRecord, User};
use storz_core::AppError;
use storz_crypto::EncryptionKey;

/// User directory operation errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    /// Transient backend failure. Retryable by the caller; the directory does
    /// not retry internally.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UserNotFound(id) => AppError::NotFound(format!("User not found: {}", id)),
            DirectoryError::AlreadyExists(id) => {
                AppError::BadRequest(format!("User already exists: {}", id))
            }
            DirectoryError::Unavailable(msg) => AppError::Directory(msg),
        }
    }
}

/// User directory abstraction.
///
/// Backends must make `append_file_record` a single atomic append scoped by
/// issuer id, so concurrent per-file pipelines for the same user never lose
/// updates to a read-modify-write race.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Total number of user records. Used for first-run bootstrap.
    async fn count(&self) -> DirectoryResult<u64>;

    async fn find_by_issuer(&self, issuer_id: &str) -> DirectoryResult<Option<User>>;

    /// Create a user with a freshly provisioned key. Fails with
    /// `AlreadyExists` when the issuer id is already taken; the stored key is
    /// never overwritten.
    async fn create_user(
        &self,
        issuer_id: &str,
        user_name: &str,
        key: EncryptionKey,
    ) -> DirectoryResult<User>;

    /// Atomically append one file record to the user's list.
    async fn append_file_record(
        &self,
        issuer_id: &str,
        record: &FileRecord,
    ) -> DirectoryResult<()>;

    /// Display name only; no file list. Absent users yield `None`, not an
    /// error.
    async fn display_name(&self, issuer_id: &str) -> DirectoryResult<Option<String>>;
}
