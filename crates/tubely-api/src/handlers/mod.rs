pub mod health;
#[cfg(feature = "storage-local")]
pub mod local_media;
pub mod video_get;
pub mod video_upload;

use tubely_core::AppError;
use uuid::Uuid;

/// Parse the `{videoID}` path segment.
pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput("Invalid ID".to_string()))
}
