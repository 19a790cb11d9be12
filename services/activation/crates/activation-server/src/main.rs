//! campfire activation server entry point.
//!
//! Initialises tracing, loads configuration from `CAMPFIRE_ACTIVATION_*`
//! environment variables and serves the activation endpoint for the one
//! instance it is scoped to.

mod ec2;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use campfire_common::ActivationServerConfig;
use tracing_subscriber::EnvFilter;

use crate::ec2::Ec2PowerControl;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("campfire-activation starting");

    let config: ActivationServerConfig = envy::prefixed("CAMPFIRE_ACTIVATION_")
        .from_env()
        .context(
            "failed to load config from CAMPFIRE_ACTIVATION_* env vars \
             (CAMPFIRE_ACTIVATION_INSTANCE_ID is required)",
        )?;
    let scope = config
        .instance()
        .context("CAMPFIRE_ACTIVATION_INSTANCE_ID is not a valid instance id")?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        instance = %scope,
        timeout_secs = config.timeout_seconds,
        region = config.region.as_deref().unwrap_or("(cli default)"),
        "configuration loaded",
    );

    let control = Ec2PowerControl::new(config.region.clone());
    let state = Arc::new(AppState::new(scope, control, config.timeout()));
    let router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("failed to bind TCP listener")?;
    tracing::info!("activation endpoint ready on http://{}/start", config.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("campfire-activation shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; shutting down");
    }
    tracing::info!("received shutdown signal");
}
