use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storz_crypto::EncryptionKey;

/// User account keyed by the identity provider's issuer id.
///
/// At most one user exists per issuer id. The encryption key is provisioned
/// at creation and is never serialized toward clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub issuer_id: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub encryption_key: EncryptionKey,
    /// Append-only from the ingestion pipeline's perspective.
    pub files: Vec<FileRecord>,
    pub created_at: DateTime<Utc>,
}

/// Metadata entry linking a user to one stored, encrypted file.
///
/// Appended only after the content store has durably accepted the ciphertext;
/// never mutated or removed by the pipeline. `size` is the store-reported
/// size of the ciphertext, not the plaintext size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_name: String,
    /// Visibility flag; uploads default to private.
    #[serde(default)]
    pub public: bool,
    /// Content identifier returned by the store.
    pub cid: String,
    /// Set at recording time, not upload time.
    pub created_at: DateTime<Utc>,
    pub size: u64,
}
