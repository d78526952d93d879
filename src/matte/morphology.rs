//! Mask clean-up kernels: 3×3 erosion/dilation and square median blur.

use rayon::prelude::*;

use crate::video::types::Mask;

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

/// One pass of a 3×3 min/max filter. Out-of-image neighbours are ignored,
/// so the image border never shrinks or grows a region on its own.
fn extremum_pass(mask: &Mask, op: Extremum) -> Mask {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let src = mask.as_raw();
    let mut out = mask.clone();

    out.as_raw_mut()
        .par_chunks_mut(w.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(h - 1);
            for (x, value) in row.iter_mut().enumerate() {
                let x0 = x.saturating_sub(1);
                let x1 = (x + 1).min(w - 1);
                let mut acc = src[y0 * w + x0];
                for ny in y0..=y1 {
                    for &v in &src[ny * w + x0..=ny * w + x1] {
                        acc = match op {
                            Extremum::Min => acc.min(v),
                            Extremum::Max => acc.max(v),
                        };
                    }
                }
                *value = acc;
            }
        });
    out
}

/// Shrink keyed regions by one pixel per iteration
pub fn erode(mask: &Mask, iterations: u32) -> Mask {
    repeat(mask, iterations, Extremum::Min)
}

/// Grow keyed regions by one pixel per iteration
pub fn dilate(mask: &Mask, iterations: u32) -> Mask {
    repeat(mask, iterations, Extremum::Max)
}

fn repeat(mask: &Mask, iterations: u32, op: Extremum) -> Mask {
    if mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = extremum_pass(&current, op);
    }
    current
}

/// Median over a `kernel`×`kernel` window with replicated borders.
///
/// `kernel` must be odd; values below 3 leave the mask unchanged.
pub fn median_blur(mask: &Mask, kernel: u32) -> Mask {
    if kernel < 3 || mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let (w, h) = (mask.width() as i64, mask.height() as i64);
    let radius = (kernel / 2) as i64;
    let src = mask.as_raw();
    let mut out = mask.clone();

    out.as_raw_mut()
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            let mut window = Vec::with_capacity((kernel * kernel) as usize);
            for (x, value) in row.iter_mut().enumerate() {
                let x = x as i64;
                window.clear();
                for dy in -radius..=radius {
                    let ny = (y + dy).clamp(0, h - 1);
                    for dx in -radius..=radius {
                        let nx = (x + dx).clamp(0, w - 1);
                        window.push(src[(ny * w + nx) as usize]);
                    }
                }
                let mid = window.len() / 2;
                *value = *window.select_nth_unstable(mid).1;
            }
        });
    out
}
