//! # Matte Extraction
//!
//! Classifies the pixels of a frame as green screen or subject and cuts the
//! subject out.
//!
//! Extraction runs in fixed order:
//! 1. RGB to 8-bit HSV conversion
//! 2. Inclusive range test against [`HsvRange`]
//! 3. Optional refinement (erode, dilate, median blur)
//! 4. Inversion, and zeroing of keyed pixels in a copy of the frame

pub mod hsv;
pub mod morphology;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ConfigError, Result};
use crate::video::types::{Frame, Mask};

pub use hsv::{Hsv, HsvRange};

/// Settings for [`FrameMatter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatteConfig {
    /// Colour window treated as green screen
    pub range: HsvRange,

    /// Run erosion, dilation and median blur over the raw mask
    pub refine: bool,

    /// 3×3 erosion passes
    pub erode_iterations: u32,

    /// 3×3 dilation passes, applied after erosion
    pub dilate_iterations: u32,

    /// Median blur window size (odd; 0 or 1 disables)
    pub median_kernel: u32,
}

impl Default for MatteConfig {
    fn default() -> Self {
        Self {
            range: HsvRange::GREEN,
            refine: true,
            erode_iterations: 2,
            dilate_iterations: 2,
            median_kernel: 5,
        }
    }
}

impl MatteConfig {
    /// The unrefined matte of the first release
    pub fn unrefined() -> Self {
        Self { refine: false, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.range.is_valid() {
            return Err(ConfigError::InvalidValue {
                key: "matte.range".to_string(),
                value: format!("{:?}..={:?}", self.range.lower, self.range.upper),
            }
            .into());
        }

        if self.median_kernel > 1 && self.median_kernel % 2 == 0 {
            return Err(ConfigError::InvalidValue {
                key: "matte.median_kernel".to_string(),
                value: self.median_kernel.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Result of matting one frame
#[derive(Debug, Clone)]
pub struct Matte {
    /// The input frame with every keyed pixel set to black
    pub foreground: Frame,

    /// Non-zero where the frame showed green screen
    pub mask: Mask,
}

/// Green-screen mask extractor
#[derive(Debug, Clone, Default)]
pub struct FrameMatter {
    config: MatteConfig,
}

impl FrameMatter {
    pub fn new(config: MatteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatteConfig {
        &self.config
    }

    /// Raw range test, one mask sample per pixel
    pub fn threshold(&self, frame: &Frame) -> Mask {
        let (width, height) = frame.dimensions();
        let mut mask = Mask::filled(width, height, Mask::KEPT);
        if width == 0 || height == 0 {
            return mask;
        }

        let range = self.config.range;
        let rgb = frame.as_rgb_bytes();
        mask.as_raw_mut()
            .par_chunks_mut(width as usize)
            .zip(rgb.par_chunks(width as usize * 3))
            .for_each(|(mask_row, rgb_row)| {
                for (m, px) in mask_row.iter_mut().zip(rgb_row.chunks_exact(3)) {
                    if range.contains_rgb([px[0], px[1], px[2]]) {
                        *m = Mask::KEYED;
                    }
                }
            });
        mask
    }

    /// Clean up a thresholded mask according to the configuration
    pub fn refine(&self, mask: Mask) -> Mask {
        if !self.config.refine {
            return mask;
        }
        let mask = morphology::erode(&mask, self.config.erode_iterations);
        let mask = morphology::dilate(&mask, self.config.dilate_iterations);
        morphology::median_blur(&mask, self.config.median_kernel)
    }

    /// Full extraction: mask plus cut-out foreground
    pub fn extract(&self, frame: &Frame) -> Matte {
        let mask = self.refine(self.threshold(frame));
        let keep = mask.inverted();

        let mut foreground = frame.clone();
        foreground
            .as_rgb_bytes_mut()
            .chunks_exact_mut(3)
            .zip(keep.as_raw())
            .filter(|(_, k)| **k == 0)
            .for_each(|(px, _)| px.fill(0));

        trace!("Matte keyed {} of {} pixels", mask.keyed_count(), mask.as_raw().len());
        Matte { foreground, mask }
    }
}
