//! RGB to HSV conversion in the 8-bit convention used by OpenCV:
//! hue in `0..180` (degrees / 2), saturation and value in `0..=255`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Inclusive HSV box, `lo <= px <= hi` on every channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lo: [u8; 3],
    pub hi: [u8; 3],
}

impl HsvRange {
    pub const fn new(lo: [u8; 3], hi: [u8; 3]) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        (self.lo[0]..=self.hi[0]).contains(&px.h)
            && (self.lo[1]..=self.hi[1]).contains(&px.s)
            && (self.lo[2]..=self.hi[2]).contains(&px.v)
    }
}

pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let mut h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        // 360° wraps to 0 after halving and rounding
        h: ((h / 2.0).round() as u16 % 180) as u8,
        s: s.round().clamp(0.0, 255.0) as u8,
        v: max as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_map_to_opencv_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv([0, 255, 0]).h, 60);
        assert_eq!(rgb_to_hsv([0, 0, 255]).h, 120);
    }

    #[test]
    fn grays_have_zero_saturation() {
        let hsv = rgb_to_hsv([40, 40, 40]);
        assert_eq!((hsv.h, hsv.s, hsv.v), (0, 0, 40));
    }

    #[test]
    fn magenta_red_lands_in_upper_band() {
        let hsv = rgb_to_hsv([220, 20, 60]);
        assert!(hsv.h >= 160, "hue {}", hsv.h);
        assert!(HsvRange::new([160, 100, 100], [180, 255, 255]).contains(hsv));
    }
}
