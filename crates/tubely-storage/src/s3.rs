use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{Attribute, Attributes, ObjectStoreExt, Result as ObjectResult, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tubely_core::models::{SignedUrl, StoredReference};

const MAX_RETRIES: usize = 3;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    /// Kept to build stores for references that point at another bucket
    builder: AmazonS3Builder,
    bucket: String,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let retry = RetryConfig {
            max_retries: MAX_RETRIES,
            ..Default::default()
        };

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone())
            .with_retry(retry);

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .clone()
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            region = %region,
            endpoint = ?endpoint_url,
            "S3 storage initialized"
        );

        Ok(S3Storage {
            store,
            builder,
            bucket,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Store used to sign a reference; the configured one unless the pointer names another bucket.
    fn store_for_bucket(&self, bucket: &str) -> StorageResult<AmazonS3> {
        if bucket == self.bucket {
            return Ok(self.store.clone());
        }
        self.builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

/// Multipart upload in flight. If dropped before `complete` succeeds (for instance when
/// the caller's deadline cancels `put`) the upload is aborted on the runtime so no parts
/// are left behind.
struct PendingUpload {
    writer: Option<BufWriter>,
    key: String,
}

impl PendingUpload {
    async fn copy_from(&mut self, reader: &mut ByteReader) -> std::io::Result<u64> {
        match self.writer.as_mut() {
            Some(writer) => tokio::io::copy(reader, writer).await,
            None => Err(std::io::Error::other("upload already finished")),
        }
    }

    async fn complete(&mut self) -> std::io::Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.shutdown().await?;
        }
        self.writer = None;
        Ok(())
    }

    async fn abort(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.abort().await {
                tracing::warn!(error = %e, key = %self.key, "Failed to abort S3 multipart upload");
            }
        }
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = writer.abort().await {
                        tracing::warn!(error = %e, key = %key, "Failed to abort cancelled S3 upload");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(key = %key, "S3 upload dropped outside a runtime; parts not aborted")
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[tracing::instrument(skip(self, reader), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn put(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        mut reader: ByteReader,
    ) -> StorageResult<StoredReference> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let store: Arc<dyn object_store::ObjectStore> = Arc::new(self.store.clone());
        let mut upload = PendingUpload {
            writer: Some(BufWriter::new(store, location).with_attributes(attributes)),
            key: key.to_string(),
        };

        let size = match upload.copy_from(&mut reader).await {
            Ok(size) => size,
            Err(e) => {
                upload.abort().await;
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    expected_bytes = ?content_length,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream upload failed while reading source"
                );
                return Err(StorageError::UploadFailed(e.to_string()));
            }
        };

        if let Err(e) = upload.complete().await {
            upload.abort().await;
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream upload failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(StoredReference::new(self.bucket.clone(), key))
    }

    async fn sign(
        &self,
        reference: &StoredReference,
        expires_in: Duration,
    ) -> StorageResult<SignedUrl> {
        let store = self
            .store_for_bucket(&reference.bucket)
            .map_err(|e| StorageError::SignFailed(e.to_string()))?;
        let location = Path::from(reference.key.clone());

        let url_result: ObjectResult<_> = store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %reference.bucket,
                    key = %reference.key,
                    "S3 presign failed"
                );
                StorageError::SignFailed(e.to_string())
            })?
            .to_string();

        let expires_at = Utc::now()
            + chrono::Duration::from_std(expires_in)
                .map_err(|e| StorageError::SignFailed(e.to_string()))?;

        Ok(SignedUrl { url, expires_at })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
