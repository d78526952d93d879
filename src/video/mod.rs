//! # Video Module
//!
//! Frame and mask types plus the streams frames travel through.

pub mod types;
pub mod stream;
pub mod ffmpeg;
pub mod memory;

pub use types::{Frame, Mask, VideoParams};
pub use stream::{FrameSink, FrameSource};
pub use ffmpeg::{check_ffmpeg_available, probe, FfmpegSink, FfmpegSource};
pub use memory::{MemorySink, MemorySource};
