//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use retouch_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// Validate configuration, install telemetry and build the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let state = Arc::new(AppState::new(config.clone()));
    state
        .sessions
        .spawn_sweeper(Duration::from_secs(config.session_sweep_interval_secs()));
    tracing::info!(
        max_sessions = config.max_sessions(),
        idle_ttl_secs = config.session_idle_ttl_secs(),
        sweep_interval_secs = config.session_sweep_interval_secs(),
        operations = state.catalog.operations().len(),
        "Session store ready"
    );

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
