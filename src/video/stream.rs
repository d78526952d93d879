use crate::error::Result;
use crate::video::types::{Frame, VideoParams};

/// A sequentially decoded stream of frames
///
/// Implementations own whatever handle backs the stream and release it when
/// dropped, so a source is released on every exit path of the code holding it.
pub trait FrameSource {
    /// Human-readable origin, used in log lines and error messages
    fn describe(&self) -> String;

    /// Parameters of the stream as declared by the container
    fn params(&self) -> VideoParams;

    /// Decode the next frame, or `Ok(None)` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Seek back to the first frame
    fn rewind(&mut self) -> Result<()>;
}

/// An append-only destination for frames
///
/// A sink that is dropped without [`FrameSink::finish`] must behave as if
/// [`FrameSink::abort`] was called: nothing it wrote may be mistaken for a
/// complete output.
pub trait FrameSink {
    fn describe(&self) -> String;

    /// Append one frame. Frames must match the sink's dimensions.
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and commit the output
    fn finish(&mut self) -> Result<()>;

    /// Discard everything written so far
    fn abort(&mut self);

    /// Frames accepted so far
    fn frames_written(&self) -> usize;
}
