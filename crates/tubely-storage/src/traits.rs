//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tubely_core::models::{SignedUrl, StoredReference};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Owned async byte source consumed by `Storage::put`
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait so the upload
/// pipeline never couples to a specific provider.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Bucket (or bucket-equivalent namespace) new objects are written to
    fn bucket(&self) -> &str;

    /// Stream `reader` to `key` until EOF and return where the object now lives.
    ///
    /// Keys are unique per upload, so an internal retry of the same key cannot clobber
    /// another upload.
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        reader: ByteReader,
    ) -> StorageResult<StoredReference>;

    /// Mint a time-limited GET URL for a stored object. Does not touch the object.
    async fn sign(
        &self,
        reference: &StoredReference,
        expires_in: Duration,
    ) -> StorageResult<SignedUrl>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
