use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-user symmetric encryption key.
///
/// Provisioned exactly once at account creation and never rotated by the
/// ingestion pipeline: every ciphertext a user has ever published must stay
/// decryptable under this key. The inner value is an opaque passphrase that
/// the cipher strengthens with PBKDF2 before use.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    /// Provision a fresh key from 32 bytes of OS randomness, hex-encoded.
    pub fn generate() -> Self {
        let mut material = [0u8; 32];
        rand::rng().fill_bytes(&mut material);
        EncryptionKey(hex::encode(material))
    }

    /// Wrap a key loaded from the user directory.
    pub fn from_string(key: String) -> Self {
        EncryptionKey(key)
    }

    /// Raw key material, for the cipher and for directory persistence only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Keys must never leak into logs or error chains.
impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}
