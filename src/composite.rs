//! Mask-driven merging of a cut-out foreground with a background frame.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VideoError};
use crate::video::types::{Frame, Mask};

/// How per-channel addition treats sums above 255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overflow {
    /// Modular 8-bit arithmetic; overlapping sources show up as artifacts
    #[default]
    Wrapping,
    /// Clamp at 255
    Saturating,
}

fn check_dims(expected: (u32, u32), actual: (u32, u32), what: &str) -> Result<()> {
    if expected != actual {
        return Err(VideoError::InvalidParameters {
            details: format!(
                "{} is {}x{}, expected {}x{}",
                what, actual.0, actual.1, expected.0, expected.1
            ),
        }
        .into());
    }
    Ok(())
}

/// Zero every background pixel where the mask is not keyed
pub fn mask_background(background: &Frame, mask: &Mask) -> Result<Frame> {
    check_dims(mask.dimensions(), background.dimensions(), "background frame")?;

    let mut out = background.clone();
    out.as_rgb_bytes_mut()
        .par_chunks_mut(3)
        .zip(mask.as_raw().par_iter())
        .filter(|(_, m)| **m == Mask::KEPT)
        .for_each(|(px, _)| px.fill(0));
    Ok(out)
}

/// Channel-wise sum of two equally sized frames
pub fn add(foreground: &Frame, background: &Frame, overflow: Overflow) -> Result<Frame> {
    check_dims(foreground.dimensions(), background.dimensions(), "background frame")?;

    let mut out = foreground.clone();
    let bg = background.as_rgb_bytes();
    out.as_rgb_bytes_mut()
        .par_iter_mut()
        .zip(bg.par_iter())
        .for_each(|(a, &b)| {
            *a = match overflow {
                Overflow::Wrapping => a.wrapping_add(b),
                Overflow::Saturating => a.saturating_add(b),
            };
        });
    Ok(out)
}

/// Place `foreground` (already cut out with `mask`) over `background`
///
/// Background pixels survive only where the mask is keyed; the result is the
/// sum of the cut-out foreground and the masked background.
pub fn composite(foreground: &Frame, mask: &Mask, background: &Frame, overflow: Overflow) -> Result<Frame> {
    check_dims(mask.dimensions(), foreground.dimensions(), "foreground frame")?;
    let masked = mask_background(background, mask)?;
    add(foreground, &masked, overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_background_keeps_only_keyed() {
        let bg = Frame::new_filled(2, 1, [0, 0, 255]);
        let mut mask = Mask::filled(2, 1, Mask::KEPT);
        mask.as_raw_mut()[1] = Mask::KEYED;

        let masked = mask_background(&bg, &mask).unwrap();
        assert_eq!(masked.get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(masked.get_pixel(1, 0), [0, 0, 255]);
    }

    #[test]
    fn test_add_overflow_modes() {
        let a = Frame::new_filled(1, 1, [200, 10, 0]);
        let b = Frame::new_filled(1, 1, [100, 10, 0]);
        assert_eq!(add(&a, &b, Overflow::Wrapping).unwrap().get_pixel(0, 0), [44, 20, 0]);
        assert_eq!(add(&a, &b, Overflow::Saturating).unwrap().get_pixel(0, 0), [255, 20, 0]);
    }

    #[test]
    fn test_composite_selects_one_source_per_pixel() {
        let mut fg = Frame::new_filled(2, 1, [255, 0, 0]);
        fg.set_pixel(0, 0, [0, 0, 0]);
        let mut mask = Mask::filled(2, 1, Mask::KEPT);
        mask.as_raw_mut()[0] = Mask::KEYED;
        let bg = Frame::new_filled(2, 1, [0, 0, 255]);

        let out = composite(&fg, &mask, &bg, Overflow::Wrapping).unwrap();
        assert_eq!(out.get_pixel(0, 0), [0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0), [255, 0, 0]);
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let fg = Frame::new_black(4, 4);
        let bg = Frame::new_black(2, 2);
        let mask = Mask::filled(4, 4, Mask::KEPT);
        assert!(composite(&fg, &mask, &bg, Overflow::Wrapping).is_err());
    }
}
