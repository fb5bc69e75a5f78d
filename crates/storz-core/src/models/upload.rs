use bytes::Bytes;
use storz_crypto::EncryptionKey;

/// One file received from the transport boundary.
///
/// Single-file and multi-file uploads are both modeled as a sequence of
/// these; nothing downstream special-cases the single-file shape.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content: Bytes,
}

/// Verified identity plus the user's encryption key, resolved once per batch.
///
/// The key is read-only shared state across all per-file pipelines in the
/// batch.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub issuer_id: String,
    pub key: EncryptionKey,
}
