//! In-memory frame streams.
//!
//! Useful for embedding the keyer in programs that already hold decoded
//! frames, and for exercising the pipeline without ffmpeg.

use crate::error::{Result, VideoError};
use crate::video::stream::{FrameSink, FrameSource};
use crate::video::types::{Frame, VideoParams};

/// A source that replays a fixed list of frames
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    params: VideoParams,
    frames: Vec<Frame>,
    cursor: usize,
    rewinds: usize,
}

impl MemorySource {
    /// Build a source from frames; params are taken from the first frame
    /// (a zero-sized stream when `frames` is empty).
    pub fn new<S: Into<String>>(name: S, fps: f64, frames: Vec<Frame>) -> Self {
        let (width, height) = frames.first().map(Frame::dimensions).unwrap_or((0, 0));
        Self {
            name: name.into(),
            params: VideoParams::new(width, height, fps),
            frames,
            cursor: 0,
            rewinds: 0,
        }
    }

    /// Override the declared params, e.g. to describe an empty stream
    pub fn with_params(mut self, params: VideoParams) -> Self {
        self.params = params;
        self
    }

    /// How many frames have been handed out since the last rewind
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemorySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn params(&self) -> VideoParams {
        self.params
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        self.rewinds += 1;
        Ok(())
    }
}

/// A sink that collects frames in a vector
///
/// Frames only become visible through [`MemorySink::frames`] after a
/// successful [`FrameSink::finish`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    params: VideoParams,
    pending: Vec<Frame>,
    committed: Option<Vec<Frame>>,
}

impl MemorySink {
    pub fn new<S: Into<String>>(name: S, params: VideoParams) -> Self {
        Self {
            name: name.into(),
            params,
            pending: Vec::new(),
            committed: None,
        }
    }

    pub fn params(&self) -> VideoParams {
        self.params
    }

    /// Committed frames, `None` until the sink is finished
    pub fn frames(&self) -> Option<&[Frame]> {
        self.committed.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.committed.is_some()
    }
}

impl FrameSink for MemorySink {
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.params.matches(frame) {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "frame is {}x{} but {} expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.name,
                    self.params.width,
                    self.params.height
                ),
            }
            .into());
        }
        self.pending.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.committed = Some(std::mem::take(&mut self.pending));
        Ok(())
    }

    fn abort(&mut self) {
        self.pending.clear();
        self.committed = None;
    }

    fn frames_written(&self) -> usize {
        self.committed.as_ref().map_or(self.pending.len(), Vec::len)
    }
}
