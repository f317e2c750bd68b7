use tracing_subscriber::EnvFilter;

use hostel_search::api;
use hostel_search::config::Config;
use hostel_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env();
    config.validate()?;
    tracing::info!(
        "Embedding provider: {} ({}, model {})",
        config.embedding.provider,
        config.embedding.base_url,
        config.embedding.model
    );

    let state = AppState::from_config(&config).await?;
    if !state.index_available() {
        tracing::warn!("Serving without a vector index; /api/search will return errors");
    }

    let cors = api::cors_layer(&config.cors_origins)?;
    let app = api::router(state, cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
