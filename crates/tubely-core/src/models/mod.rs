//! Data models for the video pipeline

mod classification;
mod playback;
mod video;

pub use classification::*;
pub use playback::*;
pub use video::*;
