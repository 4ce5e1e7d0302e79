//! Playback URL resolution.
//!
//! Records hold a `bucket,key` pointer; clients only ever see a signed URL minted for the
//! response at hand.

use crate::error::storage_error;
use std::time::Duration;
use tubely_core::models::{VideoRecord, VideoResponse};
use tubely_core::AppError;
use tubely_storage::Storage;

/// Build the client view of `record`, replacing its pointer with a freshly signed URL.
///
/// Records without a pointer, or with a legacy value that is not in `bucket,key` form,
/// are returned unchanged.
pub async fn resolve_playback(
    storage: &dyn Storage,
    record: VideoRecord,
    ttl: Duration,
) -> Result<VideoResponse, AppError> {
    let Some(reference) = record.stored_reference() else {
        return Ok(VideoResponse::from(record));
    };

    let signed = storage
        .sign(&reference, ttl)
        .await
        .map_err(storage_error)?;

    tracing::debug!(
        video_id = %record.id,
        bucket = %reference.bucket,
        key = %reference.key,
        expires_at = %signed.expires_at,
        "Signed playback URL"
    );

    Ok(VideoResponse::signed(record, signed))
}
