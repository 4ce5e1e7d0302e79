//! Playback references: what is persisted on a record versus what is handed to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::POINTER_SEPARATOR;

/// Location of a stored object. Persisted on the video record as `"{bucket},{key}"`.
///
/// Converts one way only: a reference can be signed, a `SignedUrl` never becomes a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReference {
    pub bucket: String,
    pub key: String,
}

impl StoredReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a persisted pointer. Returns `None` for empty values and legacy values that
    /// are not in `bucket,key` form (for example a plain URL).
    pub fn parse_pointer(pointer: &str) -> Option<Self> {
        let (bucket, key) = pointer.split_once(POINTER_SEPARATOR)?;
        let (bucket, key) = (bucket.trim(), key.trim());
        if bucket.is_empty() || key.is_empty() || bucket.contains('/') {
            return None;
        }
        Some(Self::new(bucket, key))
    }

    pub fn to_pointer(&self) -> String {
        format!("{}{}{}", self.bucket, POINTER_SEPARATOR, self.key)
    }
}

/// A time-limited retrieval URL. Only ever sent to clients, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
