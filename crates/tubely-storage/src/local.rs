use crate::traits::{ByteReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tubely_core::models::{SignedUrl, StoredReference};

type HmacSha256 = Hmac<Sha256>;

/// Namespace reported as the bucket of locally stored objects
pub const LOCAL_BUCKET: &str = "local";

const STAGING_PREFIX: &str = ".staging-";

/// Stream of file chunks served by the media route
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Local filesystem storage implementation
///
/// Signed URLs have the form `{base_url}/{key}?expires={unix}&signature={hex}` where the
/// signature is HMAC-SHA256 over `{key}\n{expires}`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    /// Keyed once at construction; cloned per signature
    mac: HmacSha256,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/tubely/media")
    /// * `base_url` - Base URL the media route is mounted at (e.g., "http://localhost:8091/media")
    /// * `signing_key` - Secret used to sign and verify playback URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_key: impl AsRef<[u8]>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        if signing_key.as_ref().is_empty() {
            return Err(StorageError::ConfigError(
                "Local storage signing key must not be empty".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(signing_key.as_ref())
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing key: {}", e)))?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            mac,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn mac_for(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        hex::encode(self.mac_for(key, expires).finalize().into_bytes())
    }

    /// Check a signed URL's query parameters against `key` at time `now`.
    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires {
            return false;
        }
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        self.mac_for(key, expires).verify_slice(&provided).is_ok()
    }

    /// Open a stored object for streaming.
    pub async fn open_stream(&self, key: &str) -> StorageResult<(u64, ByteStream)> {
        let path = self.key_to_path(key)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };
        let size = file.metadata().await?.len();

        let stream = tokio_util::io::ReaderStream::new(file).map(|result| {
            result.map_err(|e| StorageError::BackendError(format!("Failed to read chunk: {}", e)))
        });

        Ok((size, Box::pin(stream)))
    }

    fn signed_url_for(&self, key: &str, expires: i64) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            encoded_key,
            expires,
            self.signature(key, expires)
        )
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn bucket(&self) -> &str {
        LOCAL_BUCKET
    }

    async fn put(
        &self,
        key: &str,
        _content_type: &str,
        _content_length: Option<u64>,
        mut reader: ByteReader,
    ) -> StorageResult<StoredReference> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;
        let parent = path.parent().unwrap_or(self.base_path.as_path());

        // Staged beside the target and renamed into place. The staged file is unlinked
        // when dropped, so a cancelled or failed put leaves nothing under the key.
        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(parent)
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create staging file in {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        let (std_file, staged_path) = staged.into_parts();
        let mut file = fs::File::from_std(std_file);

        let written = async {
            let n = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;
        drop(file);

        let bytes_copied = match written {
            Ok(n) => n,
            Err(e) => {
                let staged_display = staged_path.display().to_string();
                if let Err(cleanup_err) = staged_path.close() {
                    tracing::warn!(
                        error = %cleanup_err,
                        path = %staged_display,
                        "Failed to remove staged upload"
                    );
                }
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        staged_path.persist(&path).map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move upload into place at {}: {}",
                path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(StoredReference::new(LOCAL_BUCKET, key))
    }

    async fn sign(
        &self,
        reference: &StoredReference,
        expires_in: Duration,
    ) -> StorageResult<SignedUrl> {
        if reference.bucket != LOCAL_BUCKET {
            return Err(StorageError::SignFailed(format!(
                "Local storage cannot sign objects in bucket {}",
                reference.bucket
            )));
        }
        self.key_to_path(&reference.key)?;

        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::SignFailed(e.to_string()))?;
        let expires_at = Utc::now() + ttl;

        Ok(SignedUrl {
            url: self.signed_url_for(&reference.key, expires_at.timestamp()),
            expires_at,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SIGNING_KEY: &str = "local-signing-key-for-tests-only";

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:8091/media/".to_string(), SIGNING_KEY)
            .await
            .unwrap()
    }

    fn reader(data: &[u8]) -> ByteReader {
        Box::pin(std::io::Cursor::new(data.to_vec()))
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", name)))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_local_storage_put_and_stream_back() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let data = b"not really an mp4".to_vec();

        let reference = storage
            .put("landscape/abc.mp4", "video/mp4", Some(data.len() as u64), reader(&data))
            .await
            .unwrap();
        assert_eq!(reference, StoredReference::new(LOCAL_BUCKET, "landscape/abc.mp4"));

        let (size, mut stream) = storage.open_stream("landscape/abc.mp4").await.unwrap();
        assert_eq!(size, data.len() as u64);
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(downloaded, data);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage
            .put("../../../etc/passwd", "video/mp4", None, reader(b"x"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.open_stream("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete("other/missing.mp4").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_local_storage_put_then_delete() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .put("portrait/p.mp4", "video/mp4", None, reader(b"test"))
            .await
            .unwrap();
        let path = dir.path().join("portrait/p.mp4");
        assert_eq!(std::fs::read(&path).unwrap(), b"test");
        // Only the object itself; the staging file was renamed into place
        assert_eq!(std::fs::read_dir(dir.path().join("portrait")).unwrap().count(), 1);

        storage.delete("portrait/p.mp4").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_put_cancelled_mid_stream_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        // 4 KiB arrive, then the source stalls with the writer half still open
        let (mut source, sink) = tokio::io::duplex(64 * 1024);
        source.write_all(&[7u8; 4096]).await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_millis(100),
            storage.put("landscape/abc.mp4", "video/mp4", None, Box::pin(sink)),
        )
        .await;
        assert!(result.is_err());

        assert!(!dir.path().join("landscape/abc.mp4").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("landscape")).unwrap().count(), 0);
        drop(source);
    }

    struct BrokenReader;

    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "source went away",
            )))
        }
    }

    #[tokio::test]
    async fn test_put_read_error_removes_staged_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage
            .put("other/broken.mp4", "video/mp4", None, Box::pin(BrokenReader))
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));

        assert!(!dir.path().join("other/broken.mp4").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("other")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_signed_url_verifies_until_expiry() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let reference = StoredReference::new(LOCAL_BUCKET, "landscape/k_-9.mp4");

        let signed = storage
            .sign(&reference, Duration::from_secs(600))
            .await
            .unwrap();
        assert!(signed
            .url
            .starts_with("http://localhost:8091/media/landscape/k_-9.mp4?expires="));

        let expires: i64 = query_param(&signed.url, "expires").parse().unwrap();
        let signature = query_param(&signed.url, "signature");
        assert_eq!(expires, signed.expires_at.timestamp());

        assert!(storage.verify(&reference.key, expires, signature, Utc::now()));
        assert!(!storage.verify("landscape/other.mp4", expires, signature, Utc::now()));
        assert!(!storage.verify(&reference.key, expires + 1, signature, Utc::now()));
        assert!(!storage.verify(&reference.key, expires, "zz", Utc::now()));

        let later = signed.expires_at + chrono::Duration::seconds(1);
        assert!(!storage.verify(&reference.key, expires, signature, later));
    }

    #[tokio::test]
    async fn test_sign_rejects_foreign_bucket() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let result = storage
            .sign(
                &StoredReference::new("tubely-videos", "landscape/a.mp4"),
                Duration::from_secs(60),
            )
            .await;
        assert!(matches!(result, Err(StorageError::SignFailed(_))));
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let result = storage.open_stream("other/missing.mp4").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
