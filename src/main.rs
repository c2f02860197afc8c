mod app;
mod config;
mod domain;
mod error;
mod loe;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        mock = settings.use_mock,
        "Starting LoE backend"
    );

    // Generator, catalog, prompts and document defaults
    let state = app::AppState::from_settings(settings.clone())?;

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server_addr))?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
