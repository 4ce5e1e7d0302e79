//! In-memory stand-ins for storage, the record store and the media tools.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tubely_core::models::{Classification, SignedUrl, StoredReference, VideoRecord};
use tubely_core::{AppError, StorageBackend};
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::{
    MediaProbe, NormalizedFile, ProcessingError, ProcessingResult, StreamNormalizer,
};
use tubely_storage::{ByteReader, Storage, StorageError, StorageResult};
use uuid::Uuid;

pub const TEST_BUCKET: &str = "tubely-test";

/// How `FakeStorage::put` behaves.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum PutBehavior {
    #[default]
    Store,
    Fail,
    /// Write half the body under the key, then never finish
    StallAfterPartialWrite,
}

/// Object store kept in a map. Signed URLs are deterministic and never expire in practice.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    deletes: AtomicUsize,
    put_behavior: PutBehavior,
    fail_sign: bool,
}

impl FakeStorage {
    pub fn failing_put() -> Self {
        Self {
            put_behavior: PutBehavior::Fail,
            ..Default::default()
        }
    }

    pub fn stalling_put() -> Self {
        Self {
            put_behavior: PutBehavior::StallAfterPartialWrite,
            ..Default::default()
        }
    }

    pub fn failing_sign() -> Self {
        Self {
            fail_sign: true,
            ..Default::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for FakeStorage {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        _content_length: Option<u64>,
        mut reader: ByteReader,
    ) -> StorageResult<StoredReference> {
        if self.put_behavior == PutBehavior::Fail {
            return Err(StorageError::UploadFailed("connection reset".to_string()));
        }
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        if self.put_behavior == PutBehavior::StallAfterPartialWrite {
            body.truncate(body.len() / 2);
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (content_type.to_string(), body));
        if self.put_behavior == PutBehavior::StallAfterPartialWrite {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(StoredReference::new(TEST_BUCKET, key))
    }

    async fn sign(
        &self,
        reference: &StoredReference,
        expires_in: Duration,
    ) -> StorageResult<SignedUrl> {
        if self.fail_sign {
            return Err(StorageError::SignFailed("no credentials in chain".to_string()));
        }
        let expires_at = Utc::now() + chrono::Duration::from_std(expires_in).unwrap();
        Ok(SignedUrl {
            url: format!(
                "https://signed.example/{}/{}?expires={}",
                reference.bucket,
                reference.key,
                expires_at.timestamp()
            ),
            expires_at,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Probe with a canned answer.
pub enum FakeProbe {
    Classify(Classification),
    Fail,
    Hang,
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe(&self, path: &Path) -> ProcessingResult<Classification> {
        assert!(path.exists(), "probe must see the buffered upload");
        match self {
            FakeProbe::Classify(classification) => Ok(*classification),
            FakeProbe::Fail => Err(ProcessingError::ToolFailed {
                tool: "ffprobe",
                status: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            }),
            FakeProbe::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Classification::Other)
            }
        }
    }
}

/// Normalizer that writes `FASTSTART:` followed by the input, or leaves partial output
/// behind and then fails or hangs.
pub enum FakeNormalizer {
    Prefix,
    FailWithPartialOutput,
    HangWithPartialOutput,
}

pub const NORMALIZED_PREFIX: &[u8] = b"FASTSTART:";

#[async_trait]
impl StreamNormalizer for FakeNormalizer {
    async fn normalize(&self, input: &Path) -> ProcessingResult<NormalizedFile> {
        let output = NormalizedFile::sibling_of(input);
        let original = tokio::fs::read(input).await?;
        match self {
            FakeNormalizer::Prefix => {
                let mut body = NORMALIZED_PREFIX.to_vec();
                body.extend_from_slice(&original);
                tokio::fs::write(output.path(), body).await?;
                Ok(output)
            }
            FakeNormalizer::FailWithPartialOutput => {
                tokio::fs::write(output.path(), &original[..original.len() / 2]).await?;
                Err(ProcessingError::ToolFailed {
                    tool: "ffmpeg",
                    status: Some(1),
                    stderr: "moov atom not found".to_string(),
                })
            }
            FakeNormalizer::HangWithPartialOutput => {
                tokio::fs::write(output.path(), &original[..original.len() / 2]).await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(output)
            }
        }
    }
}

/// Record store whose writes always fail; reads go to the wrapped store.
pub struct FailingUpdateRepository {
    pub inner: InMemoryVideoRepository,
}

#[async_trait]
impl VideoRepository for FailingUpdateRepository {
    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, AppError> {
        self.inner.get(id).await
    }

    async fn update(&self, _video: &VideoRecord) -> Result<(), AppError> {
        Err(AppError::Internal("connection to server was lost".to_string()))
    }
}
