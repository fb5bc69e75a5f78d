//! Transient file staging
//!
//! Each per-file pipeline stages its plaintext under the spool before
//! encryption and parks the ciphertext next to it. Both paths are owned by
//! exactly one pipeline run and are removed on every exit path, so the spool
//! never accumulates orphaned plaintext secrets.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const PLAINTEXT_DIR: &str = "private";
const CIPHERTEXT_DIR: &str = "encrypted";

/// Plaintext and ciphertext paths for one in-flight file.
#[derive(Debug, Clone)]
pub struct TransientFile {
    pub plaintext: PathBuf,
    pub ciphertext: PathBuf,
}

/// Spool directory for transient pipeline files.
#[derive(Clone)]
pub struct Spool {
    base: PathBuf,
}

impl Spool {
    /// Open (and create if needed) the spool under `base`.
    pub async fn new(base: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base = base.into();
        fs::create_dir_all(base.join(PLAINTEXT_DIR)).await?;
        fs::create_dir_all(base.join(CIPHERTEXT_DIR)).await?;
        Ok(Spool { base })
    }

    /// Write one uploaded file's bytes into the spool.
    ///
    /// Staged names carry a fresh uuid so files with colliding upload names
    /// never share transient paths. Only the final path component of the
    /// client-supplied name is used.
    pub async fn stage(&self, file_name: &str, content: &Bytes) -> std::io::Result<TransientFile> {
        let safe_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let staged_name = format!("{}-{}", Uuid::new_v4(), safe_name);

        let plaintext = self.base.join(PLAINTEXT_DIR).join(&staged_name);
        let ciphertext = self.base.join(CIPHERTEXT_DIR).join(&staged_name);

        fs::write(&plaintext, content).await?;

        Ok(TransientFile {
            plaintext,
            ciphertext,
        })
    }

    /// Best-effort removal of all transient paths.
    ///
    /// Runs after success and after every failure class alike, including the
    /// `.part` fragment an interrupted atomic ciphertext write leaves behind.
    /// A removal failure is logged and never changes the file's pipeline
    /// outcome.
    pub async fn cleanup(&self, transient: &TransientFile) {
        let mut part = transient.ciphertext.as_os_str().to_os_string();
        part.push(".part");
        let part = PathBuf::from(part);

        for path in [&transient.plaintext, &transient.ciphertext, &part] {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Transient file already removed");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cleanup warning");
                }
            }
        }
    }
}
