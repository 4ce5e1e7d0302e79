//! Application setup and initialization
//!
//! Everything `main` needs to go from configuration to a running router, kept out of
//! `main.rs` so tests can build the same state.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let videos = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let state = services::initialize_services(&config, videos, storage).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
