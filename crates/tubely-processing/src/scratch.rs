//! Request-scoped files on local disk.
//!
//! Both guards delete their file when dropped, so every exit path of a request
//! (success, error, panic unwinding, body-size abort) leaves nothing behind.

use crate::error::{ProcessingError, ProcessingResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const SCRATCH_PREFIX: &str = "tubely-upload-";
const SCRATCH_SUFFIX: &str = ".mp4";
const NORMALIZED_SUFFIX: &str = ".processing";

/// Raw upload buffered to disk under a hard byte ceiling.
pub struct ScratchFile {
    // Dropped before `path`, so the handle is closed when the file is unlinked
    file: File,
    path: TempPath,
    written: u64,
    limit_bytes: u64,
}

impl ScratchFile {
    /// Create an empty scratch file with a unique name inside `dir`.
    pub fn create(dir: &Path, limit_bytes: u64) -> ProcessingResult<Self> {
        let named = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(dir)?;
        let (file, path) = named.into_parts();

        Ok(Self {
            file: File::from_std(file),
            path,
            written: 0,
            limit_bytes,
        })
    }

    /// Append a chunk. Fails with `TooLarge` before writing if the ceiling would be crossed.
    pub async fn append(&mut self, chunk: &[u8]) -> ProcessingResult<()> {
        let next = self.written + chunk.len() as u64;
        if next > self.limit_bytes {
            return Err(ProcessingError::TooLarge {
                limit_bytes: self.limit_bytes,
            });
        }
        self.file.write_all(chunk).await?;
        self.written = next;
        Ok(())
    }

    /// Flush buffered writes so external tools see the whole payload.
    pub async fn finish(&mut self) -> ProcessingResult<u64> {
        self.file.flush().await?;
        self.file.sync_data().await?;
        Ok(self.written)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }
}

/// Output of the normalizer, `<scratch>.processing`, deleted on drop.
#[derive(Debug)]
pub struct NormalizedFile {
    path: PathBuf,
}

impl NormalizedFile {
    /// Claim the sibling path `<input>.processing`. Whatever is written there is removed
    /// when the guard drops, including partial output of a failed tool run.
    pub fn sibling_of(input: &Path) -> Self {
        let mut name = OsString::from(input.as_os_str());
        name.push(NORMALIZED_SUFFIX);
        Self {
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn open(&self) -> std::io::Result<File> {
        File::open(&self.path).await
    }

    pub async fn len(&self) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}

impl Drop for NormalizedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove normalized file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_scratch_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let mut scratch = ScratchFile::create(dir.path(), 1024).unwrap();
        scratch.append(b"abc").await.unwrap();
        assert_eq!(scratch.finish().await.unwrap(), 3);

        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_scratch_file_enforces_ceiling() {
        let dir = tempdir().unwrap();
        let mut scratch = ScratchFile::create(dir.path(), 4).unwrap();
        scratch.append(b"abcd").await.unwrap();

        let err = scratch.append(b"e").await.unwrap_err();
        assert!(matches!(err, ProcessingError::TooLarge { limit_bytes: 4 }));
        assert_eq!(scratch.len(), 4);
    }

    #[tokio::test]
    async fn test_normalized_file_sibling_and_cleanup() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tubely-upload-x.mp4");
        let normalized = NormalizedFile::sibling_of(&input);
        assert_eq!(
            normalized.path(),
            dir.path().join("tubely-upload-x.mp4.processing")
        );

        tokio::fs::write(normalized.path(), b"moov first").await.unwrap();
        assert_eq!(normalized.len().await.unwrap(), 10);

        let path = normalized.path().to_path_buf();
        drop(normalized);
        assert!(!path.exists());
    }

    #[test]
    fn test_normalized_guard_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let normalized = NormalizedFile::sibling_of(&dir.path().join("never-written.mp4"));
        drop(normalized);
    }
}
