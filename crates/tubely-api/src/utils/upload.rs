//! Multipart upload extraction.

use crate::error::{multipart_error, processing_error, PipelineStage};
use axum::extract::Multipart;
use std::path::Path;
use tubely_core::constants::{VIDEO_CONTENT_TYPE, VIDEO_FORM_FIELD};
use tubely_core::AppError;
use tubely_processing::ScratchFile;

/// Essence of a declared content type: parameters stripped, lowercased.
/// `video/mp4; codecs="avc1"` becomes `video/mp4`.
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reject anything whose declared media type is not `video/mp4`.
pub fn validate_video_content_type(content_type: Option<&str>) -> Result<String, AppError> {
    let essence = content_type.map(media_type_essence).unwrap_or_default();
    if essence != VIDEO_CONTENT_TYPE {
        return Err(AppError::InvalidInput("Invalid file type".to_string()));
    }
    Ok(essence)
}

/// The buffered `video` field of a multipart upload.
pub struct BufferedUpload {
    pub scratch: ScratchFile,
    pub content_type: String,
}

/// Stream the `video` field into a scratch file under `scratch_dir`.
///
/// Other fields are skipped. The content type is checked before any byte is written, and
/// the scratch file enforces `max_bytes` chunk by chunk, so an oversize body is rejected
/// before it is fully read. The scratch file is removed when the returned guard drops, or
/// immediately on any error here.
pub async fn buffer_video_field(
    mut multipart: Multipart,
    scratch_dir: &Path,
    max_bytes: u64,
) -> Result<BufferedUpload, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(VIDEO_FORM_FIELD) {
            continue;
        }

        let content_type = validate_video_content_type(field.content_type())?;

        let mut scratch = ScratchFile::create(scratch_dir, max_bytes)
            .map_err(|e| processing_error(PipelineStage::Buffer, e))?;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            scratch
                .append(&chunk)
                .await
                .map_err(|e| processing_error(PipelineStage::Buffer, e))?;
        }

        let size = scratch
            .finish()
            .await
            .map_err(|e| processing_error(PipelineStage::Buffer, e))?;
        if size == 0 {
            return Err(AppError::InvalidInput("Video file is empty".to_string()));
        }

        tracing::debug!(size_bytes = size, "Buffered upload to scratch file");
        return Ok(BufferedUpload {
            scratch,
            content_type,
        });
    }

    Err(AppError::InvalidInput(format!(
        "Missing '{}' form field",
        VIDEO_FORM_FIELD
    )))
}
