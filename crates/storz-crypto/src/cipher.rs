//! Encryption stage: plaintext file in, sealed ciphertext file out.
//!
//! AES-256-GCM with a key derived from the user's passphrase via
//! PBKDF2-HMAC-SHA256 at a fixed iteration count. The iteration count and
//! on-disk layout are load-bearing: files sealed under one configuration
//! cannot be opened under another, so neither may change once data exists.
//!
//! On-disk layout: `salt (16) || nonce (12) || ciphertext+tag`.

use crate::key::EncryptionKey;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Fixed PBKDF2 iteration count for key strengthening.
pub const KDF_ITERATIONS: u32 = 655_000;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// Encryption stage errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("failed to read plaintext {path}: {source}")]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write ciphertext {path}: {source}")]
    UnwritableDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cipher operation failed: {0}")]
    Cipher(String),

    #[error("ciphertext is malformed: {0}")]
    Malformed(String),
}

fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut key);
    key
}

fn seal(passphrase: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut salt);
    rand::rng().fill_bytes(&mut nonce);

    let key_bytes = derive_key(passphrase, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Cipher(format!("encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open(passphrase: &str, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < HEADER_LEN {
        return Err(CryptoError::Malformed(format!(
            "sealed data too short: {} bytes",
            sealed.len()
        )));
    }

    let (salt, rest) = sealed.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key_bytes = derive_key(passphrase, salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::Cipher(format!("decryption failed: {}", e)))
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Write sealed bytes next to the destination and rename into place, so a
/// partially written ciphertext is never visible under the final name.
async fn write_atomically(path: &Path, data: &[u8]) -> Result<(), CryptoError> {
    let part = part_path(path);

    fs::write(&part, data)
        .await
        .map_err(|source| CryptoError::UnwritableDestination {
            path: part.clone(),
            source,
        })?;

    fs::rename(&part, path)
        .await
        .map_err(|source| CryptoError::UnwritableDestination {
            path: path.to_path_buf(),
            source,
        })
}

/// Encrypt a plaintext file into a ciphertext file with the user's key.
///
/// The plaintext is read in full before any ciphertext becomes visible;
/// key derivation and sealing run on the blocking pool.
pub async fn encrypt_file(
    plaintext_path: &Path,
    ciphertext_path: &Path,
    key: &EncryptionKey,
) -> Result<(), CryptoError> {
    let start = std::time::Instant::now();

    let plaintext =
        fs::read(plaintext_path)
            .await
            .map_err(|source| CryptoError::UnreadableSource {
                path: plaintext_path.to_path_buf(),
                source,
            })?;
    let plaintext_len = plaintext.len();

    let passphrase = key.expose().to_string();
    let sealed = tokio::task::spawn_blocking(move || seal(&passphrase, &plaintext))
        .await
        .map_err(|e| CryptoError::Cipher(format!("encryption task aborted: {}", e)))??;

    write_atomically(ciphertext_path, &sealed).await?;

    tracing::debug!(
        path = %ciphertext_path.display(),
        plaintext_bytes = plaintext_len,
        ciphertext_bytes = sealed.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "File encrypted"
    );

    Ok(())
}

/// Decrypt a ciphertext file produced by [`encrypt_file`] with the same key.
pub async fn decrypt_file(
    ciphertext_path: &Path,
    plaintext_path: &Path,
    key: &EncryptionKey,
) -> Result<(), CryptoError> {
    let sealed =
        fs::read(ciphertext_path)
            .await
            .map_err(|source| CryptoError::UnreadableSource {
                path: ciphertext_path.to_path_buf(),
                source,
            })?;

    let passphrase = key.expose().to_string();
    let plaintext = tokio::task::spawn_blocking(move || open(&passphrase, &sealed))
        .await
        .map_err(|e| CryptoError::Cipher(format!("decryption task aborted: {}", e)))??;

    write_atomically(plaintext_path, &plaintext).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_encrypt_decrypt_round_trip() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("note.txt");
        let sealed = dir.path().join("note.txt.enc");
        let restored = dir.path().join("note.txt.dec");
        let key = EncryptionKey::generate();

        let content = b"the quick brown fox".to_vec();
        fs::write(&plain, &content).await.unwrap();

        encrypt_file(&plain, &sealed, &key).await.unwrap();
        decrypt_file(&sealed, &restored, &key).await.unwrap();

        assert_eq!(fs::read(&restored).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_ciphertext_differs_from_plaintext() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("a.bin");
        let sealed = dir.path().join("a.bin.enc");
        let key = EncryptionKey::generate();

        fs::write(&plain, b"secret bytes").await.unwrap();
        encrypt_file(&plain, &sealed, &key).await.unwrap();

        let sealed_bytes = fs::read(&sealed).await.unwrap();
        assert!(sealed_bytes.len() > HEADER_LEN);
        assert!(!sealed_bytes
            .windows(b"secret bytes".len())
            .any(|w| w == b"secret bytes"));
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("b.txt");
        let sealed = dir.path().join("b.txt.enc");
        let restored = dir.path().join("b.txt.dec");

        fs::write(&plain, b"data").await.unwrap();
        encrypt_file(&plain, &sealed, &EncryptionKey::generate())
            .await
            .unwrap();

        let result = decrypt_file(&sealed, &restored, &EncryptionKey::generate()).await;
        assert!(matches!(result, Err(CryptoError::Cipher(_))));
    }

    #[tokio::test]
    async fn test_truncated_ciphertext_is_rejected() {
        let dir = tempdir().unwrap();
        let sealed = dir.path().join("short.enc");
        let restored = dir.path().join("short.dec");

        fs::write(&sealed, b"too short").await.unwrap();

        let result = decrypt_file(&sealed, &restored, &EncryptionKey::generate()).await;
        assert!(matches!(result, Err(CryptoError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_plaintext_is_reported() {
        let dir = tempdir().unwrap();
        let result = encrypt_file(
            &dir.path().join("absent.txt"),
            &dir.path().join("absent.enc"),
            &EncryptionKey::generate(),
        )
        .await;
        assert!(matches!(result, Err(CryptoError::UnreadableSource { .. })));
    }

    #[tokio::test]
    async fn test_no_part_file_left_behind() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("c.txt");
        let sealed = dir.path().join("c.txt.enc");
        let key = EncryptionKey::generate();

        fs::write(&plain, b"payload").await.unwrap();
        encrypt_file(&plain, &sealed, &key).await.unwrap();

        assert!(fs::try_exists(&sealed).await.unwrap());
        assert!(!fs::try_exists(&part_path(&sealed)).await.unwrap());
    }
}
