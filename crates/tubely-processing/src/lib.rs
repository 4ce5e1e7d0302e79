//! Tubely Processing Library
//!
//! Local-file stages of the upload pipeline: the scratch file that buffers an upload,
//! aspect-ratio probing through ffprobe, and faststart remuxing through ffmpeg. Both
//! external tools run as child processes under a deadline and are killed when the
//! calling future is dropped.

pub mod command;
pub mod error;
pub mod scratch;
pub mod video;

pub use error::{ProcessingError, ProcessingResult};
pub use scratch::{NormalizedFile, ScratchFile};
pub use video::{FfmpegFaststart, FfprobeProbe, MediaProbe, StreamNormalizer};
