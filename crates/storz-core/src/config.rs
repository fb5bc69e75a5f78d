//! Configuration module
//!
//! Environment-driven configuration for the API service and the ingestion
//! pipeline, loaded once at startup and validated before anything is wired.

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_IPFS_API_URL: &str = "http://127.0.0.1:5001";
const DEFAULT_SPOOL_DIR: &str = "./spool";
const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;
const DEFAULT_PER_FILE_TIMEOUT_SECS: u64 = 120;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub ipfs_api_url: String,
    pub jwt_secret: String,
    /// Directory for transient plaintext/ciphertext files during ingestion.
    pub spool_dir: PathBuf,
    pub max_file_size_bytes: usize,
    /// Upper bound on per-file pipelines running at once within a batch.
    pub max_concurrent_files: usize,
    pub per_file_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} is not a valid value for {}", raw, name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server_port: env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            ipfs_api_url: env::var("IPFS_API_URL")
                .unwrap_or_else(|_| DEFAULT_IPFS_API_URL.to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            spool_dir: PathBuf::from(
                env::var("SPOOL_DIR").unwrap_or_else(|_| DEFAULT_SPOOL_DIR.to_string()),
            ),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE_BYTES)?,
            max_concurrent_files: env_or("MAX_CONCURRENT_FILES", DEFAULT_MAX_CONCURRENT_FILES)?,
            per_file_timeout_secs: env_or("PER_FILE_TIMEOUT_SECS", DEFAULT_PER_FILE_TIMEOUT_SECS)?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters");
        }
        if self.max_concurrent_files == 0 {
            bail!("MAX_CONCURRENT_FILES must be at least 1");
        }
        if self.per_file_timeout_secs == 0 {
            bail!("PER_FILE_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
