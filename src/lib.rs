//! # greenkey
//!
//! Green-screen background replacement for video files.
//!
//! Every frame of a foreground video is matted against a green HSV window,
//! and the keyed pixels are replaced with the matching frame of a background
//! video, which loops when it is shorter than the foreground.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use greenkey::{config::Config, pipeline::Pipeline};
//!
//! # fn main() -> greenkey::Result<()> {
//! let pipeline = Pipeline::new(Config::default());
//! let summary = pipeline.process_files("input_video.mp4", "output_video.mp4", "background_video.mp4")?;
//! println!("wrote {} frames", summary.frames_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with decoded frames
//!
//! The pipeline runs over the [`FrameSource`](video::FrameSource) and
//! [`FrameSink`](video::FrameSink) traits, so frames can come from anywhere:
//!
//! ```rust
//! use greenkey::{
//!     config::Config,
//!     pipeline::Pipeline,
//!     progress::NoProgress,
//!     video::{Frame, FrameSource, MemorySink, MemorySource},
//! };
//!
//! let mut subject = MemorySource::new("subject", 30.0, vec![Frame::new_filled(8, 8, [0, 255, 0])]);
//! let mut backdrop = MemorySource::new("backdrop", 30.0, vec![Frame::new_filled(8, 8, [0, 0, 255])]);
//! let mut out = MemorySink::new("out", subject.params());
//!
//! Pipeline::new(Config::default())
//!     .run(&mut subject, &mut backdrop, &mut out, &mut NoProgress)
//!     .unwrap();
//! assert_eq!(out.frames().unwrap()[0].get_pixel(0, 0), [0, 0, 255]);
//! ```
//!
//! ## Architecture
//!
//! - [`matte`] - HSV thresholding and mask refinement
//! - [`composite`] - mask-driven merging of two frames
//! - [`pipeline`] - the frame loop and background policy
//! - [`video`] - frame types and ffmpeg/in-memory streams
//! - [`config`] - configuration management

pub mod composite;
pub mod config;
pub mod error;
pub mod matte;
pub mod pipeline;
pub mod progress;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{KeyerError, Result},
    matte::FrameMatter,
    pipeline::{Pipeline, RunSummary},
};
