use anyhow::Result;
use tracing_subscriber::EnvFilter;

use pawfinder::config::Config;
use pawfinder::handlers;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::load();

    let state = pawfinder::build_state(&config).await;
    let router = handlers::router(state);

    let bind = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %listener.local_addr()?, "Starting PawFinder HTTP server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
