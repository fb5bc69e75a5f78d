//! Tracing initialization
//!
//! Human-readable output in development, JSON lines in production. The
//! filter honors `RUST_LOG` and defaults to `info`.

use storz_core::Config;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
