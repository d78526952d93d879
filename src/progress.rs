//! Run observers.
//!
//! The pipeline reports its lifecycle through [`ProgressHook`] instead of
//! owning any terminal UI.

use std::time::Instant;

use tracing::{debug, info};

use crate::pipeline::RunSummary;
use crate::video::types::VideoParams;

/// Receives lifecycle events from a pipeline run
pub trait ProgressHook {
    /// Called once the output stream is open
    fn on_start(&mut self, params: &VideoParams) {
        let _ = params;
    }

    /// Called after frame `index` (0-based) has been written, every
    /// `progress_interval` frames
    fn on_frame(&mut self, index: usize) {
        let _ = index;
    }

    /// Called after the output has been committed
    fn on_finish(&mut self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressHook for NoProgress {}

/// Reports progress through `tracing`
#[derive(Debug, Default)]
pub struct LogProgress {
    started: Option<Instant>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressHook for LogProgress {
    fn on_start(&mut self, params: &VideoParams) {
        self.started = Some(Instant::now());
        info!(
            "Processing video... ({}x{} @ {:.2} fps)",
            params.width, params.height, params.fps
        );
    }

    fn on_frame(&mut self, index: usize) {
        let elapsed = self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
        let rate = if elapsed > 0.0 { (index + 1) as f64 / elapsed } else { 0.0 };
        debug!("Frame {} done ({:.1} frames/s)", index + 1, rate);
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        let elapsed = self.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);
        info!(
            "Processed {} frames in {:.1}s ({} background rewinds)",
            summary.frames_written, elapsed, summary.background_rewinds
        );
    }
}

/// Records every event; handy for assertions
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub started: Option<VideoParams>,
    pub frames: Vec<usize>,
    pub finished: Option<RunSummary>,
}

impl ProgressHook for RecordingProgress {
    fn on_start(&mut self, params: &VideoParams) {
        self.started = Some(*params);
    }

    fn on_frame(&mut self, index: usize) {
        self.frames.push(index);
    }

    fn on_finish(&mut self, summary: &RunSummary) {
        self.finished = Some(summary.clone());
    }
}
