//! File encryption for Storz
//!
//! This crate provides per-user encryption key provisioning and the
//! encryption stage of the ingestion pipeline: plaintext file in, sealed
//! ciphertext file out, AES-256-GCM with PBKDF2 key strengthening.

pub mod cipher;
pub mod key;

pub use cipher::{decrypt_file, encrypt_file, CryptoError, KDF_ITERATIONS};
pub use key::EncryptionKey;
