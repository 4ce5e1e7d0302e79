use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::playback::{SignedUrl, StoredReference};

/// A video metadata record as held by the record store.
///
/// `video_url` holds a playback pointer (`bucket,key`), never a signed URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
}

impl VideoRecord {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// The stored object this record points at, if the pointer is in `bucket,key` form.
    pub fn stored_reference(&self) -> Option<StoredReference> {
        self.video_url
            .as_deref()
            .and_then(StoredReference::parse_pointer)
    }

    /// Replace the playback pointer and bump `updated_at`.
    pub fn with_pointer(mut self, reference: &StoredReference) -> Self {
        self.video_url = Some(reference.to_pointer());
        self.updated_at = Utc::now();
        self
    }
}

/// A video record as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    /// Signed playback URL, or the stored value unchanged when it is not a pointer
    pub video_url: Option<String>,
    /// Expiry of `video_url` when it is a signed URL
    pub video_url_expires_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

impl VideoResponse {
    /// Build a response carrying a freshly signed URL in place of the pointer.
    pub fn signed(record: VideoRecord, signed: SignedUrl) -> Self {
        let mut response = Self::from(record);
        response.video_url = Some(signed.url);
        response.video_url_expires_at = Some(signed.expires_at);
        response
    }
}

impl From<VideoRecord> for VideoResponse {
    fn from(record: VideoRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            title: record.title,
            description: record.description,
            thumbnail_url: record.thumbnail_url,
            video_url: record.video_url,
            video_url_expires_at: None,
            user_id: record.user_id,
        }
    }
}
