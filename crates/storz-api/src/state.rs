use crate::auth::IdentityVerifier;
use std::sync::Arc;
use storz_core::Config;
use storz_directory::UserDirectory;
use storz_ingest::Ingestor;

/// Application state: the orchestrator and its injected collaborators, with
/// lifetime scoped to process start and shutdown.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub directory: Arc<dyn UserDirectory>,
    pub ingestor: Arc<Ingestor>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

#[allow(dead_code)]
fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<AppState>();
    assert_sync::<AppState>();
}
