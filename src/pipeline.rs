//! # Keying Pipeline
//!
//! Drives the frame loop: decode a foreground frame, fetch the matching
//! background frame, matte, composite, write.
//!
//! Streams are borrowed as trait objects so the same loop runs over ffmpeg
//! pipes and in-memory frames. Whatever happens inside the loop, the sink is
//! either finished or aborted before [`Pipeline::run`] returns, and every
//! stream handle is released when its owner drops it.

use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::{
    composite,
    config::{BackgroundMode, Config},
    error::{Result, VideoError},
    matte::FrameMatter,
    progress::{LogProgress, ProgressHook},
    video::{FfmpegSink, FfmpegSource, Frame, FrameSink, FrameSource, VideoParams},
};

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Composite frames committed to the output
    pub frames_written: usize,

    /// Times the background stream was restarted from its first frame
    pub background_rewinds: usize,

    /// Parameters of the output stream
    pub output: VideoParams,
}

/// Hands out one background frame per foreground frame
pub struct BackgroundFeed<'a> {
    source: &'a mut dyn FrameSource,
    mode: BackgroundMode,
    current: Option<Frame>,
    rewinds: usize,
}

impl<'a> BackgroundFeed<'a> {
    pub fn new(source: &'a mut dyn FrameSource, mode: BackgroundMode) -> Self {
        Self {
            source,
            mode,
            current: None,
            rewinds: 0,
        }
    }

    pub fn rewinds(&self) -> usize {
        self.rewinds
    }

    /// Background frame for a foreground frame of `width`×`height`
    ///
    /// In looping mode every call decodes the next frame, restarting the
    /// stream once when it is exhausted. In static mode the first frame is
    /// decoded on the first call and reused afterwards. Either way the frame
    /// is resized to exactly `width`×`height`.
    pub fn next_for(&mut self, width: u32, height: u32) -> Result<&Frame> {
        let frame = match (self.mode, self.current.take()) {
            (BackgroundMode::Static, Some(cached)) => cached,
            _ => self.decode()?,
        };

        let frame = if frame.dimensions() != (width, height) {
            trace!(
                "Resizing background {}x{} -> {}x{}",
                frame.width(),
                frame.height(),
                width,
                height
            );
            frame.resized(width, height)
        } else {
            frame
        };

        Ok(self.current.insert(frame))
    }

    fn decode(&mut self) -> Result<Frame> {
        if let Some(frame) = self.source.next_frame()? {
            return Ok(frame);
        }

        debug!("Background {} exhausted, restarting", self.source.describe());
        self.source.rewind()?;
        self.rewinds += 1;

        match self.source.next_frame()? {
            Some(frame) => Ok(frame),
            None => Err(VideoError::EmptyBackground { path: self.source.describe() }.into()),
        }
    }
}

/// Chroma-key compositor
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: Config,
    matter: FrameMatter,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let matter = FrameMatter::new(config.matte.clone());
        Self { config, matter }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Key `input` over `background` and write the result to `output`
    ///
    /// The output file only appears once every frame has been encoded.
    pub fn process_files<P: AsRef<Path>>(&self, input: P, output: P, background: P) -> Result<RunSummary> {
        let (input, output, background) = (input.as_ref(), output.as_ref(), background.as_ref());
        info!("Input: {:?}", input);
        info!("Background: {:?}", background);
        info!("Output: {:?}", output);

        let mut foreground = FfmpegSource::open(input)?;
        let mut backdrop = FfmpegSource::open(background)?;
        let mut sink = FfmpegSink::create(output, foreground.params(), &self.config.pipeline.codec_tag)?;

        let mut progress = LogProgress::new();
        self.run(&mut foreground, &mut backdrop, &mut sink, &mut progress)
    }

    /// Run the frame loop over arbitrary streams
    ///
    /// On success the sink has been finished; on any error it has been
    /// aborted.
    pub fn run(
        &self,
        foreground: &mut dyn FrameSource,
        background: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        progress: &mut dyn ProgressHook,
    ) -> Result<RunSummary> {
        let result = self
            .run_frames(foreground, background, sink, progress)
            .and_then(|summary| {
                sink.finish()?;
                Ok(summary)
            });

        match result {
            Ok(summary) => {
                progress.on_finish(&summary);
                Ok(summary)
            }
            Err(e) => {
                warn!("Aborting {}: {}", sink.describe(), e);
                sink.abort();
                Err(e)
            }
        }
    }

    fn run_frames(
        &self,
        foreground: &mut dyn FrameSource,
        background: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        progress: &mut dyn ProgressHook,
    ) -> Result<RunSummary> {
        let settings = &self.config.pipeline;
        let params = foreground.params();
        let mut feed = BackgroundFeed::new(background, settings.background_mode);

        if settings.background_mode == BackgroundMode::Static {
            feed.next_for(params.width, params.height)?;
        }

        progress.on_start(&params);

        let mut index = 0;
        while let Some(frame) = foreground.next_frame()? {
            let (width, height) = frame.dimensions();
            let backdrop = feed.next_for(width, height)?;

            let matte = self.matter.extract(&frame);
            let composed = composite::composite(&matte.foreground, &matte.mask, backdrop, settings.overflow)?;
            sink.write_frame(&composed)?;

            if settings.progress_interval > 0 && (index + 1) % settings.progress_interval == 0 {
                progress.on_frame(index);
            }
            index += 1;
        }

        if index == 0 && !settings.allow_empty_input {
            return Err(VideoError::EmptyInput { path: foreground.describe() }.into());
        }
        if index == 0 {
            warn!("{} has no frames, writing an empty output", foreground.describe());
        }

        Ok(RunSummary {
            frames_written: index,
            background_rewinds: feed.rewinds(),
            output: params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, RecordingProgress};
    use crate::video::{MemorySink, MemorySource};

    fn numbered(count: usize, width: u32, height: u32) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::new_filled(width, height, [0, 0, 10 * (i as u8 + 1)]))
            .collect()
    }

    #[test]
    fn test_looping_feed_wraps_modulo_length() {
        let mut source = MemorySource::new("bg", 30.0, numbered(3, 2, 2));
        let mut feed = BackgroundFeed::new(&mut source, BackgroundMode::Looping);

        let blues: Vec<u8> = (0..7).map(|_| feed.next_for(2, 2).unwrap().get_pixel(0, 0)[2]).collect();
        assert_eq!(blues, vec![10, 20, 30, 10, 20, 30, 10]);
        assert_eq!(feed.rewinds(), 2);
    }

    #[test]
    fn test_static_feed_decodes_once() {
        let mut source = MemorySource::new("bg", 30.0, numbered(3, 2, 2));
        {
            let mut feed = BackgroundFeed::new(&mut source, BackgroundMode::Static);
            for _ in 0..5 {
                assert_eq!(feed.next_for(2, 2).unwrap().get_pixel(0, 0), [0, 0, 10]);
            }
            assert_eq!(feed.rewinds(), 0);
        }
        assert_eq!(source.position(), 1);
    }

    #[test]
    fn test_feed_resizes_to_request() {
        let mut source = MemorySource::new("bg", 30.0, numbered(1, 640, 360));
        let mut feed = BackgroundFeed::new(&mut source, BackgroundMode::Looping);
        assert_eq!(feed.next_for(1920, 1080).unwrap().dimensions(), (1920, 1080));
        assert_eq!(feed.next_for(1920, 1080).unwrap().dimensions(), (1920, 1080));
    }

    #[test]
    fn test_empty_background_is_fatal() {
        let mut source = MemorySource::new("empty-bg", 30.0, Vec::new());
        let mut feed = BackgroundFeed::new(&mut source, BackgroundMode::Looping);
        let err = feed.next_for(4, 4).unwrap_err();
        assert!(err.is_empty_background());
    }

    #[test]
    fn test_run_aborts_sink_on_empty_background() {
        let mut fg = MemorySource::new("fg", 30.0, numbered(2, 4, 4));
        let mut bg = MemorySource::new("bg", 30.0, Vec::new());
        let mut sink = MemorySink::new("out", fg.params());

        let err = Pipeline::default()
            .run(&mut fg, &mut bg, &mut sink, &mut NoProgress)
            .unwrap_err();
        assert!(err.is_empty_background());
        assert!(!sink.is_finished());
        assert_eq!(sink.frames_written(), 0);
    }

    #[test]
    fn test_static_mode_rejects_empty_background_up_front() {
        let mut fg = MemorySource::new("fg", 30.0, numbered(2, 4, 4));
        let mut bg = MemorySource::new("bg", 30.0, Vec::new());
        let mut sink = MemorySink::new("out", fg.params());

        let err = Pipeline::new(Config::legacy())
            .run(&mut fg, &mut bg, &mut sink, &mut NoProgress)
            .unwrap_err();
        assert!(err.is_empty_background());
        assert_eq!(fg.position(), 0);
    }

    #[test]
    fn test_empty_input_policy() {
        let params = VideoParams::new(4, 4, 30.0);
        let mut bg = MemorySource::new("bg", 30.0, numbered(1, 4, 4));

        let mut fg = MemorySource::new("fg", 30.0, Vec::new()).with_params(params);
        let mut sink = MemorySink::new("out", params);
        let err = Pipeline::default()
            .run(&mut fg, &mut bg, &mut sink, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, crate::error::KeyerError::Video(VideoError::EmptyInput { .. })));
        assert!(!sink.is_finished());

        let mut config = Config::default();
        config.pipeline.allow_empty_input = true;
        let mut fg = MemorySource::new("fg", 30.0, Vec::new()).with_params(params);
        let mut sink = MemorySink::new("out", params);
        let summary = Pipeline::new(config)
            .run(&mut fg, &mut bg, &mut sink, &mut NoProgress)
            .unwrap();
        assert_eq!(summary.frames_written, 0);
        assert_eq!(sink.frames().unwrap().len(), 0);
    }

    #[test]
    fn test_progress_events() {
        let mut config = Config::default();
        config.pipeline.progress_interval = 2;
        let mut fg = MemorySource::new("fg", 24.0, numbered(5, 4, 4));
        let mut bg = MemorySource::new("bg", 24.0, numbered(2, 4, 4));
        let mut sink = MemorySink::new("out", fg.params());
        let mut progress = RecordingProgress::default();

        let summary = Pipeline::new(config)
            .run(&mut fg, &mut bg, &mut sink, &mut progress)
            .unwrap();

        assert_eq!(progress.started, Some(VideoParams::new(4, 4, 24.0)));
        assert_eq!(progress.frames, vec![1, 3]);
        assert_eq!(progress.finished, Some(summary.clone()));
        assert_eq!(summary.background_rewinds, 2);
    }
}
