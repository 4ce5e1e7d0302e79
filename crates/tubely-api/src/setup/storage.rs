//! Storage setup and initialization

use anyhow::{Context, Result};
use tubely_core::Config;
use tubely_storage::{create_storage, StorageHandles};

pub async fn setup_storage(config: &Config) -> Result<StorageHandles> {
    tracing::info!(backend = %config.storage_backend(), "Initializing storage...");
    let handles = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(
        backend = %handles.storage.backend_type(),
        bucket = %handles.storage.bucket(),
        "Storage initialized successfully"
    );
    Ok(handles)
}
