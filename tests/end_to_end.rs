use greenkey::{
    config::{BackgroundMode, Config},
    error::{KeyerError, VideoError},
    pipeline::Pipeline,
    progress::NoProgress,
    video::{Frame, FrameSink, FrameSource, MemorySink, MemorySource},
};
use image::{ImageBuffer, Rgb};

const GREEN: [u8; 3] = [0, 255, 0];
const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];

fn half_and_half(width: u32, height: u32) -> Frame {
    Frame::new(ImageBuffer::from_fn(width, height, |x, _| {
        Rgb(if x < width / 2 { GREEN } else { RED })
    }))
}

fn run(config: Config, fg: &mut MemorySource, bg: &mut MemorySource) -> (Result<greenkey::RunSummary, KeyerError>, MemorySink) {
    let mut sink = MemorySink::new("out", fg.params());
    let result = Pipeline::new(config).run(fg, bg, &mut sink, &mut NoProgress);
    (result, sink)
}

#[test]
fn green_red_split_over_blue() {
    let (w, h) = (32, 18);
    let mut fg = MemorySource::new(
        "fg",
        30.0,
        vec![
            Frame::new_filled(w, h, GREEN),
            Frame::new_filled(w, h, RED),
            half_and_half(w, h),
        ],
    );
    let mut bg = MemorySource::new("bg", 30.0, vec![Frame::new_filled(w, h, BLUE)]);

    for config in [Config::default(), Config::legacy()] {
        fg.rewind().unwrap();
        bg.rewind().unwrap();
        let (result, sink) = run(config, &mut fg, &mut bg);
        let summary = result.unwrap();
        assert_eq!(summary.frames_written, 3);

        let frames = sink.frames().unwrap();
        assert_eq!(frames[0], Frame::new_filled(w, h, BLUE));
        assert_eq!(frames[1], Frame::new_filled(w, h, RED));
        for y in 0..h {
            for x in 0..w {
                let expected = if x < w / 2 { BLUE } else { RED };
                assert_eq!(frames[2].get_pixel(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }
}

#[test]
fn frame_count_is_preserved() {
    for count in [1usize, 2, 7, 31] {
        let frames = (0..count).map(|_| Frame::new_filled(6, 4, RED)).collect();
        let mut fg = MemorySource::new("fg", 25.0, frames);
        let mut bg = MemorySource::new("bg", 25.0, vec![Frame::new_filled(6, 4, BLUE); 3]);

        let (result, sink) = run(Config::default(), &mut fg, &mut bg);
        assert_eq!(result.unwrap().frames_written, count);
        assert_eq!(sink.frames().unwrap().len(), count);
    }
}

#[test]
fn background_loops_modulo_its_length() {
    let background_len = 3;
    let foreground_len = 8;

    let backgrounds: Vec<Frame> = (0..background_len)
        .map(|i| Frame::new_filled(4, 4, [0, 0, 50 + 50 * i as u8]))
        .collect();
    let mut bg = MemorySource::new("bg", 30.0, backgrounds.clone());
    let mut fg = MemorySource::new("fg", 30.0, vec![Frame::new_filled(4, 4, GREEN); foreground_len]);

    let (result, sink) = run(Config::default(), &mut fg, &mut bg);
    result.unwrap();

    for (i, frame) in sink.frames().unwrap().iter().enumerate() {
        assert_eq!(frame, &backgrounds[i % background_len], "foreground frame {}", i);
    }
}

#[test]
fn static_background_reuses_first_frame() {
    let mut bg = MemorySource::new(
        "bg",
        30.0,
        vec![Frame::new_filled(4, 4, BLUE), Frame::new_filled(4, 4, RED)],
    );
    let mut fg = MemorySource::new("fg", 30.0, vec![Frame::new_filled(4, 4, GREEN); 4]);

    let mut config = Config::default();
    config.pipeline.background_mode = BackgroundMode::Static;
    let (result, sink) = run(config, &mut fg, &mut bg);
    assert_eq!(result.unwrap().background_rewinds, 0);

    for frame in sink.frames().unwrap() {
        assert_eq!(frame, &Frame::new_filled(4, 4, BLUE));
    }
}

#[test]
fn small_background_is_scaled_to_foreground() {
    let mut fg = MemorySource::new("fg", 30.0, vec![Frame::new_filled(1920, 1080, GREEN)]);
    let mut bg = MemorySource::new("bg", 30.0, vec![Frame::new_filled(640, 360, BLUE)]);

    let (result, sink) = run(Config::legacy(), &mut fg, &mut bg);
    result.unwrap();

    let out = &sink.frames().unwrap()[0];
    assert_eq!(out.dimensions(), (1920, 1080));
    assert_eq!(out.get_pixel(0, 0), BLUE);
    assert_eq!(out.get_pixel(1919, 1079), BLUE);
}

#[test]
fn empty_background_leaves_nothing_behind() {
    let mut fg = MemorySource::new("fg", 30.0, vec![Frame::new_filled(4, 4, GREEN); 3]);
    let mut bg = MemorySource::new("bg", 30.0, Vec::new());

    let (result, sink) = run(Config::default(), &mut fg, &mut bg);
    match result {
        Err(KeyerError::Video(VideoError::EmptyBackground { path })) => assert_eq!(path, "bg"),
        other => panic!("expected EmptyBackground, got {:?}", other),
    }
    assert!(sink.frames().is_none());
    assert_eq!(sink.frames_written(), 0);
}
