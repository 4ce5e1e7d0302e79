//! Application state assembly

use crate::auth::JwtValidator;
use crate::state::{AppState, MediaConfig, SecurityConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{FfmpegFaststart, FfprobeProbe};
use tubely_storage::StorageHandles;

/// Wire the record store, storage backend and media tools into `AppState`.
pub async fn initialize_services(
    config: &Config,
    videos: Arc<dyn VideoRepository>,
    storage: StorageHandles,
) -> Result<Arc<AppState>> {
    let limits = config.upload_limits().clone();

    let probe = FfprobeProbe::new(config.ffprobe_path(), limits.probe_timeout)
        .context("Invalid FFPROBE_PATH")?;
    let normalizer = FfmpegFaststart::new(config.ffmpeg_path(), limits.normalize_timeout)
        .context("Invalid FFMPEG_PATH")?;

    let scratch_dir = config.scratch_dir().clone();
    tokio::fs::create_dir_all(&scratch_dir)
        .await
        .with_context(|| format!("Failed to create scratch directory {}", scratch_dir.display()))?;

    tracing::info!(
        scratch_dir = %scratch_dir.display(),
        ffprobe_path = %config.ffprobe_path(),
        ffmpeg_path = %config.ffmpeg_path(),
        max_video_size_bytes = limits.max_video_size_bytes,
        signed_url_ttl_secs = limits.signed_url_ttl.as_secs(),
        "Media pipeline configured"
    );

    Ok(Arc::new(AppState {
        videos,
        media: MediaConfig {
            storage: storage.storage,
            #[cfg(feature = "storage-local")]
            local_storage: storage.local,
            probe: Arc::new(probe),
            normalizer: Arc::new(normalizer),
            limits,
            scratch_dir,
        },
        security: SecurityConfig {
            jwt: Arc::new(JwtValidator::new(config.jwt_secret())),
        },
    }))
}
