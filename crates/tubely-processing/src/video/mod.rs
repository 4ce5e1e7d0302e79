//! Video stages backed by ffprobe and ffmpeg

pub mod normalizer;
pub mod probe;

pub use normalizer::{FfmpegFaststart, StreamNormalizer};
pub use probe::{FfprobeProbe, MediaProbe};
