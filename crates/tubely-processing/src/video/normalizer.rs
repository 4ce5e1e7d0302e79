//! Faststart remuxing.

use crate::command::{run_tool, validate_executable, validate_input};
use crate::error::ProcessingResult;
use crate::scratch::NormalizedFile;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

const TOOL: &str = "ffmpeg";

/// Produces a playback-optimized copy of a local media file.
#[async_trait]
pub trait StreamNormalizer: Send + Sync {
    /// Write the normalized copy next to `input`. The input itself is never modified.
    async fn normalize(&self, input: &Path) -> ProcessingResult<NormalizedFile>;
}

/// `StreamNormalizer` that moves the moov atom to the front with
/// `ffmpeg -c copy -movflags faststart`, without re-encoding.
#[derive(Debug, Clone)]
pub struct FfmpegFaststart {
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegFaststart {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> ProcessingResult<Self> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_executable(&ffmpeg_path)?;
        Ok(Self {
            ffmpeg_path,
            timeout,
        })
    }
}

#[async_trait]
impl StreamNormalizer for FfmpegFaststart {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn normalize(&self, input: &Path) -> ProcessingResult<NormalizedFile> {
        validate_input(input)?;

        // Claimed before the run so a partial output is removed on any failure
        let output = NormalizedFile::sibling_of(input);

        run_tool(
            TOOL,
            &self.ffmpeg_path,
            [
                OsStr::new("-i"),
                input.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("faststart"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
                output.path().as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        tracing::debug!(output = %output.path().display(), "Normalized for progressive playback");
        Ok(output)
    }
}
