//! `meridian serve`

use anyhow::{Context, Result};
use meridian_runtime::EngineConfig;
use tokio::net::TcpListener;

use crate::bootstrap;
use crate::config::ServerConfig;
use crate::http::{self, AppState};

pub async fn handle(port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = port {
        config = config.with_port(port);
    }

    let services = bootstrap::build(&config, EngineConfig::from_env())?;
    let state = AppState::new(services.engine, config.sse_keepalive);
    let app = http::router(state, &config.cors_origins);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("bind port {}", config.port))?;
    tracing::info!(port = config.port, "meridian listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
