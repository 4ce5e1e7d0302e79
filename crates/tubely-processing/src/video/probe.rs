//! Aspect-ratio probing.

use crate::command::{run_tool, validate_executable, validate_input};
use crate::error::{ProcessingError, ProcessingResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tubely_core::models::Classification;

const TOOL: &str = "ffprobe";

/// Classifies a local media file by its display aspect ratio.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> ProcessingResult<Classification>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    display_aspect_ratio: Option<String>,
}

/// Classify raw `ffprobe -print_format json -show_streams` output.
///
/// Only the first stream is consulted. Zero streams is an error; a first stream with no
/// aspect ratio classifies as `Other`.
pub fn classify_probe_output(stdout: &[u8]) -> ProcessingResult<Classification> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| ProcessingError::InvalidOutput {
            tool: TOOL,
            message: e.to_string(),
        })?;

    let first = output
        .streams
        .first()
        .ok_or_else(|| ProcessingError::InvalidOutput {
            tool: TOOL,
            message: "no streams found".to_string(),
        })?;

    Ok(Classification::from_aspect_ratio(
        first.display_aspect_ratio.as_deref(),
    ))
}

/// `MediaProbe` that shells out to ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> ProcessingResult<Self> {
        let ffprobe_path = ffprobe_path.into();
        validate_executable(&ffprobe_path)?;
        Ok(Self {
            ffprobe_path,
            timeout,
        })
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn probe(&self, path: &Path) -> ProcessingResult<Classification> {
        validate_input(path)?;

        let output = run_tool(
            TOOL,
            &self.ffprobe_path,
            [
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-print_format"),
                OsStr::new("json"),
                OsStr::new("-show_streams"),
                path.as_os_str(),
            ],
            self.timeout,
        )
        .await?;

        let classification = classify_probe_output(&output.stdout)?;
        tracing::debug!(classification = %classification, "Probed aspect ratio");
        Ok(classification)
    }
}
