use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Multipart;
use tubely_core::models::{Classification, StoredReference, VideoRecord, VideoResponse};
use tubely_core::AppError;
use tubely_processing::{NormalizedFile, ScratchFile};
use tubely_storage::{plan_key, ByteReader};
use uuid::Uuid;

use crate::error::{processing_error, storage_error, PipelineStage};
use crate::services::playback::resolve_playback;
use crate::state::AppState;
use crate::utils::upload::buffer_video_field;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Video upload pipeline
///
/// Drives one upload through buffer, probe, normalize, plan, store, record update and
/// sign. Every stage is fatal; there are no retries at this level. Local files are owned
/// by RAII guards and are gone by the time `upload` returns, whatever the outcome.
pub struct VideoUploadService {
    state: Arc<AppState>,
}

impl VideoUploadService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Complete upload workflow for `video_id` on behalf of `owner`.
    #[tracing::instrument(skip(self, multipart), fields(video_id = %video_id, user_id = %owner))]
    pub async fn upload(
        &self,
        owner: Uuid,
        video_id: Uuid,
        multipart: Multipart,
    ) -> Result<VideoResponse, AppError> {
        let pipeline_start = Instant::now();
        let record = self.authorize(owner, video_id).await?;

        let limits = &self.state.media.limits;
        let upload = buffer_video_field(
            multipart,
            &self.state.media.scratch_dir,
            limits.max_video_size_bytes,
        )
        .await?;
        tracing::info!(
            size_bytes = upload.scratch.len(),
            content_type = %upload.content_type,
            "Upload buffered"
        );

        let classification = self.probe(&upload.scratch).await?;
        let normalized = self.normalize(upload.scratch).await?;

        let key = plan_key(classification, &upload.content_type);
        let reference = self
            .store(&key, &upload.content_type, normalized)
            .await?;

        let updated = self.record_pointer(record, &reference).await?;

        let response = resolve_playback(
            self.state.media.storage.as_ref(),
            updated,
            limits.signed_url_ttl,
        )
        .await?;

        tracing::info!(
            classification = %classification,
            bucket = %reference.bucket,
            key = %reference.key,
            duration_ms = elapsed_ms(pipeline_start),
            "Video upload complete"
        );

        Ok(response)
    }

    /// Fetch the record and check that `owner` may modify it.
    async fn authorize(&self, owner: Uuid, video_id: Uuid) -> Result<VideoRecord, AppError> {
        let record = self
            .state
            .videos
            .get(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Couldn't find video".to_string()))?;

        if !record.is_owned_by(owner) {
            return Err(AppError::Forbidden(
                "Not authorized to update this video".to_string(),
            ));
        }

        Ok(record)
    }

    async fn probe(&self, scratch: &ScratchFile) -> Result<Classification, AppError> {
        let start = Instant::now();
        let classification = with_deadline(
            "ffprobe",
            self.state.media.limits.probe_timeout,
            self.state.media.probe.probe(scratch.path()),
        )
        .await?
        .map_err(|e| processing_error(PipelineStage::Probe, e))?;

        tracing::info!(
            classification = %classification,
            duration_ms = elapsed_ms(start),
            "Probed aspect ratio"
        );
        Ok(classification)
    }

    /// Normalize the scratch file. The scratch file is consumed and removed once the
    /// normalized copy exists, and on failure.
    async fn normalize(&self, scratch: ScratchFile) -> Result<NormalizedFile, AppError> {
        let start = Instant::now();
        let normalized = with_deadline(
            "ffmpeg",
            self.state.media.limits.normalize_timeout,
            self.state.media.normalizer.normalize(scratch.path()),
        )
        .await?
        .map_err(|e| processing_error(PipelineStage::Normalize, e))?;
        drop(scratch);

        tracing::info!(duration_ms = elapsed_ms(start), "Normalized for faststart");
        Ok(normalized)
    }

    /// Upload the normalized file under `key`. The local copy is removed when this returns.
    /// A failed or timed out upload may have left part of the object behind, so the key is
    /// deleted on a best-effort basis before the error is returned.
    async fn store(
        &self,
        key: &str,
        content_type: &str,
        normalized: NormalizedFile,
    ) -> Result<StoredReference, AppError> {
        let start = Instant::now();
        let file = normalized.open().await?;
        let size = normalized.len().await?;
        let reader: ByteReader = Box::pin(file);

        let stored = with_deadline(
            "storage upload",
            self.state.media.limits.store_timeout,
            self.state
                .media
                .storage
                .put(key, content_type, Some(size), reader),
        )
        .await
        .and_then(|result| result.map_err(storage_error));

        let reference = match stored {
            Ok(reference) => reference,
            Err(e) => {
                self.discard_object(key, &e).await;
                return Err(e);
            }
        };

        tracing::info!(
            bucket = %reference.bucket,
            key = %reference.key,
            size_bytes = size,
            duration_ms = elapsed_ms(start),
            "Stored normalized video"
        );
        Ok(reference)
    }

    /// Persist the pointer on the record. If the write fails the stored object would be
    /// orphaned, so it is discarded before the error is returned.
    async fn record_pointer(
        &self,
        record: VideoRecord,
        reference: &StoredReference,
    ) -> Result<VideoRecord, AppError> {
        let updated = record.with_pointer(reference);

        if let Err(e) = self.state.videos.update(&updated).await {
            self.discard_object(&reference.key, &e).await;
            return Err(e);
        }

        Ok(updated)
    }

    /// Best-effort delete of `key` after `cause` failed the request. The outcome is only
    /// logged; `cause` is what the caller sees.
    async fn discard_object(&self, key: &str, cause: &AppError) {
        let deleted = with_deadline(
            "storage delete",
            self.state.media.limits.store_timeout,
            self.state.media.storage.delete(key),
        )
        .await
        .and_then(|result| result.map_err(storage_error));

        match deleted {
            Ok(()) => tracing::warn!(
                error = %cause,
                key = %key,
                "Upload failed after storage was touched; removed stored object"
            ),
            Err(cleanup_err) => tracing::error!(
                error = %cause,
                cleanup_error = %cleanup_err,
                key = %key,
                "Upload failed after storage was touched; stored object is orphaned"
            ),
        }
    }
}

/// Run `fut` under `deadline`, reporting expiry as `AppError::Timeout`.
///
/// The external tools carry their own deadline as well; this one also covers injected
/// implementations and the storage client.
async fn with_deadline<F: std::future::Future>(
    operation: &'static str,
    deadline: Duration,
    fut: F,
) -> Result<F::Output, AppError> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| AppError::Timeout {
            operation,
            seconds: deadline.as_secs(),
        })
}
