use serde::{Deserialize, Serialize};

/// 8-bit HSV sample: hue in `0..180` (degrees halved), saturation and value
/// in `0..=255`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Convert one RGB pixel
    ///
    /// Bit-exact with OpenCV's 8-bit `RGB2HSV`: hue and saturation are
    /// computed in 12-bit fixed point with reciprocal tables rather than in
    /// floating point, so pixels on a range boundary (hue 40 or 80) land on
    /// the same side they would in OpenCV.
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let v = r.max(g).max(b);
        let diff = v - r.min(g).min(b);

        let s = (diff * SAT_DIV[v as usize] + HALF) >> SHIFT;

        // Red wins ties, then green
        let h = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let mut h = (h * HUE_DIV[diff as usize] + HALF) >> SHIFT;
        if h < 0 {
            h += 180;
        }

        Self { h: h as u8, s: s as u8, v: v as u8 }
    }
}

const SHIFT: i32 = 12;
const HALF: i32 = 1 << (SHIFT - 1);

/// `round((255 << 12) / i)`, zero at 0
const SAT_DIV: [i32; 256] = reciprocal_table(255 << SHIFT, 1);
/// `round((180 << 12) / (6 * i))`, zero at 0
const HUE_DIV: [i32; 256] = reciprocal_table(180 << SHIFT, 6);

const fn reciprocal_table(numerator: i32, scale: i32) -> [i32; 256] {
    let mut table = [0; 256];
    let mut i = 1;
    while i < 256 {
        let den = scale * i as i32;
        table[i] = (2 * numerator + den) / (2 * den);
        i += 1;
    }
    table
}

/// Inclusive HSV box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    /// The classic green-screen window
    pub const GREEN: HsvRange = HsvRange {
        lower: Hsv::new(40, 40, 40),
        upper: Hsv::new(80, 255, 255),
    };

    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }

    /// Convert and test an RGB pixel
    pub fn contains_rgb(&self, rgb: [u8; 3]) -> bool {
        self.contains(Hsv::from_rgb(rgb))
    }

    pub fn is_valid(&self) -> bool {
        self.lower.h <= self.upper.h
            && self.lower.s <= self.upper.s
            && self.lower.v <= self.upper.v
            && self.upper.h < 180
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self::GREEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_colours() {
        assert_eq!(Hsv::from_rgb([255, 0, 0]), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb([0, 255, 0]), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb([0, 0, 255]), Hsv::new(120, 255, 255));
    }

    #[test]
    fn test_greys_have_no_hue_or_saturation() {
        assert_eq!(Hsv::from_rgb([0, 0, 0]), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb([128, 128, 128]), Hsv::new(0, 0, 128));
    }

    #[test]
    fn test_fixed_point_hue_on_range_edge() {
        // Float hue is 80.5 and rounds up to 81; the fixed-point path gives 80
        assert_eq!(Hsv::from_rgb([0, 79, 54]), Hsv::new(80, 255, 79));
        assert!(HsvRange::GREEN.contains_rgb([0, 79, 54]));
    }

    #[test]
    fn test_screen_green_components() {
        assert_eq!(Hsv::from_rgb([40, 180, 60]), Hsv::new(64, 198, 180));
    }

    #[test]
    fn test_hue_wraps_below_180() {
        // 359 degrees halves to 179.5, which must wrap instead of reaching 180
        let hsv = Hsv::from_rgb([255, 0, 1]);
        assert!(hsv.h < 180);
    }

    #[test]
    fn test_green_range_bounds_are_inclusive() {
        let range = HsvRange::GREEN;
        assert!(range.contains(Hsv::new(40, 40, 40)));
        assert!(range.contains(Hsv::new(80, 255, 255)));
        assert!(!range.contains(Hsv::new(39, 255, 255)));
        assert!(!range.contains(Hsv::new(81, 255, 255)));
        assert!(!range.contains(Hsv::new(60, 39, 255)));
        assert!(!range.contains(Hsv::new(60, 255, 39)));
    }

    #[test]
    fn test_typical_screen_greens() {
        let range = HsvRange::GREEN;
        assert!(range.contains_rgb([0, 255, 0]));
        assert!(range.contains_rgb([40, 180, 60]));
        assert!(!range.contains_rgb([255, 0, 0]));
        assert!(!range.contains_rgb([0, 0, 255]));
        // Too dark to count as screen
        assert!(!range.contains_rgb([0, 30, 0]));
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let range = HsvRange::new(Hsv::new(80, 40, 40), Hsv::new(40, 255, 255));
        assert!(!range.is_valid());
        assert!(HsvRange::GREEN.is_valid());
    }
}
