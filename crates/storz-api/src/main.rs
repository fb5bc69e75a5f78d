mod auth;
mod error;
mod handlers;
mod setup;
mod state;
mod telemetry;

use storz_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    telemetry::init_tracing(&config);

    // Initialize the application (database, services, routes)
    let (_state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::start_server(&config, router).await?;

    Ok(())
}
