use image::{imageops::FilterType, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

/// Represents a single video frame
///
/// A thin wrapper around an RGB image buffer. Channel order is always RGB,
/// which is what the ffmpeg pipes in this crate negotiate (`rgb24`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Raw interleaved RGB bytes, row-major
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub(crate) fn as_rgb_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Number of bytes a `width`×`height` RGB24 frame occupies
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Bilinear resize to exactly `width`×`height`
    ///
    /// Returns a clone when the frame already has the requested size.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        Frame::new(image::imageops::resize(&self.buffer, width, height, FilterType::Triangle))
    }
}

/// Single-channel mask aligned with a [`Frame`]
///
/// `255` marks a pixel whose colour fell inside the key range (the green
/// screen), `0` marks subject pixels. Refinement passes may briefly produce
/// other values, but every value other than `0` is treated as keyed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    buffer: GrayImage,
}

impl Mask {
    pub const KEYED: u8 = 255;
    pub const KEPT: u8 = 0;

    pub fn new(buffer: GrayImage) -> Self {
        Self { buffer }
    }

    /// A mask with every pixel set to `value`
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self { buffer: ImageBuffer::from_pixel(width, height, Luma([value])) }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.buffer.get_pixel(x, y).0[0]
    }

    pub fn is_keyed(&self, x: u32, y: u32) -> bool {
        self.get(x, y) != Self::KEPT
    }

    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.buffer
    }

    /// Bitwise NOT of every sample
    pub fn inverted(&self) -> Mask {
        let mut out = self.clone();
        out.as_raw_mut().iter_mut().for_each(|v| *v = !*v);
        out
    }

    /// Number of samples that are keyed
    pub fn keyed_count(&self) -> usize {
        self.as_raw().iter().filter(|&&v| v != Self::KEPT).count()
    }
}

/// Stream parameters shared by sources and sinks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoParams {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self { width, height, fps }
    }

    pub fn frame_bytes(&self) -> usize {
        Frame::byte_len(self.width, self.height)
    }

    /// Matches the frame's width and height
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.dimensions() == (self.width, self.height)
    }
}
