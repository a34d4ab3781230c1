use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use fruitslot_server::{router, AppState, ServerConfig, SqliteStore};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let store = SqliteStore::connect(&config.database_url, config.max_connections).await?;
    info!(database = %config.database_url, "session store ready");

    let app = router(AppState::new(Arc::new(store)));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
