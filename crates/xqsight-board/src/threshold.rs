//! Binarization for board localization.
//!
//! Masks are `GrayImage`s holding `0` (background) or `255` (foreground).
//! Foreground is the *dark* side: board lines and frames on a light board.

use serde::{Deserialize, Serialize};
use xqsight_core::{GrayImage, GrayImageView};

/// How the grayscale screenshot is turned into a foreground mask.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Pixel is foreground when it is at least `c` below the Gaussian-weighted
    /// mean of its `block_size x block_size` neighbourhood.
    AdaptiveGaussian { block_size: usize, c: f32 },
    /// Global Otsu threshold; foreground is `<= t`.
    Otsu,
}

impl Default for ThresholdMode {
    fn default() -> Self {
        Self::AdaptiveGaussian {
            block_size: 11,
            c: 2.0,
        }
    }
}

pub fn binarize(src: &GrayImageView<'_>, mode: &ThresholdMode) -> GrayImage {
    match *mode {
        ThresholdMode::AdaptiveGaussian { block_size, c } => {
            adaptive_threshold_gaussian_inv(src, block_size, c)
        }
        ThresholdMode::Otsu => match otsu_threshold(src.data) {
            Some(t) => map_mask(src, |v| v <= t),
            None => GrayImage::new(src.width, src.height),
        },
    }
}

fn map_mask(src: &GrayImageView<'_>, fg: impl Fn(u8) -> bool) -> GrayImage {
    GrayImage {
        width: src.width,
        height: src.height,
        data: src.data.iter().map(|&v| if fg(v) { 255 } else { 0 }).collect(),
    }
}

/// Sigma OpenCV derives for a Gaussian kernel of size `k` when none is given.
fn default_sigma(k: usize) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(k: usize) -> Vec<f32> {
    let sigma = default_sigma(k);
    let r = (k / 2) as i32;
    let mut w: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = w.iter().sum();
    for v in &mut w {
        *v /= sum;
    }
    w
}

/// Inverted adaptive Gaussian threshold with replicated borders.
pub fn adaptive_threshold_gaussian_inv(
    src: &GrayImageView<'_>,
    block_size: usize,
    c: f32,
) -> GrayImage {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }
    let k = block_size.max(3) | 1;
    let kernel = gaussian_kernel(k);
    let r = (k / 2) as isize;

    let clamp = |v: isize, hi: usize| v.clamp(0, hi as isize - 1) as usize;

    let mut horiz = vec![0f32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (i, kw) in kernel.iter().enumerate() {
                let sx = clamp(x as isize + i as isize - r, w);
                acc += kw * row[sx] as f32;
            }
            horiz[y * w + x] = acc;
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, kw) in kernel.iter().enumerate() {
                let sy = clamp(y as isize + i as isize - r, h);
                acc += kw * horiz[sy * w + x];
            }
            let mean = acc.round();
            let v = src.data[y * w + x] as f32;
            if v - mean <= -c {
                out.data[y * w + x] = 255;
            }
        }
    }
    out
}

/// Otsu threshold over all pixels. `None` for a uniform image, which has no
/// meaningful split.
pub fn otsu_threshold(samples: &[u8]) -> Option<u8> {
    let (&min_v, &max_v) = (samples.iter().min()?, samples.iter().max()?);
    if min_v == max_v {
        return None;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return Some(((min_v as u16 + max_v as u16) / 2) as u8);
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    Some(best_t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(w: usize, h: usize, f: impl Fn(usize, usize) -> u8) -> GrayImage {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        GrayImage {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(11);
        assert_eq!(k.len(), 11);
        approx::assert_abs_diff_eq!(k.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(k[0], k[10], epsilon = 1e-7);
        approx::assert_abs_diff_eq!(default_sigma(11), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn uniform_image_has_no_foreground() {
        let g = img(40, 30, |_, _| 200);
        let mask = binarize(&g.view(), &ThresholdMode::default());
        assert!(mask.data.iter().all(|&v| v == 0));
        let mask = binarize(&g.view(), &ThresholdMode::Otsu);
        assert!(mask.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn dark_line_on_light_background_is_foreground() {
        let g = img(40, 30, |x, _| if x == 20 { 30 } else { 220 });
        let mask = adaptive_threshold_gaussian_inv(&g.view(), 11, 2.0);
        for y in 0..30 {
            assert_eq!(mask.get(20, y), 255);
            assert_eq!(mask.get(5, y), 0);
            assert_eq!(mask.get(35, y), 0);
        }
    }

    #[test]
    fn otsu_splits_bimodal_samples() {
        let mut samples = vec![20u8; 100];
        samples.extend(std::iter::repeat(30).take(50));
        samples.extend(std::iter::repeat(200).take(100));
        samples.extend(std::iter::repeat(210).take(50));
        let t = otsu_threshold(&samples).expect("bimodal");
        assert!((30..200).contains(&t), "t = {t}");
    }
}
