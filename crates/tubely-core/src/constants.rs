//! Shared constants

/// The only media type accepted by the video upload pipeline.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Multipart field carrying the video payload.
pub const VIDEO_FORM_FIELD: &str = "video";

/// Separator between bucket and key in a persisted playback pointer.
pub const POINTER_SEPARATOR: char = ',';

/// Default lifetime of a signed playback URL.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 600;
