use anyhow::Context;
use tracing_subscriber::EnvFilter;

use propdesk_api::{app, config, is_development, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("propdesk_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    tracing::info!("Starting PropDesk API in {:?} mode", config.environment);
    anyhow::ensure!(
        !config.security.jwt_secret.is_empty(),
        "JWT_SECRET must be set outside development"
    );
    if is_development!() {
        tracing::warn!("Development preset active: built-in JWT secret and in-memory storage unless overridden");
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::connect(config).await.context("failed to initialize backends")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("PropDesk API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("PropDesk API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
