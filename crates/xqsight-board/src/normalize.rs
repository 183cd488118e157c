//! Perspective normalization: rectify the located board into a fixed-size,
//! top-down image with black at the top and red at the bottom.

use crate::locate::CornerSet;
use crate::NormalizeError;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use xqsight_core::{homography_from_4pt, warp_perspective_rgb, ColorImage, ColorImageView, Homography};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerParams {
    pub width: usize,
    pub height: usize,
}

impl Default for NormalizerParams {
    fn default() -> Self {
        Self {
            width: 450,
            height: 500,
        }
    }
}

/// Rectified board image plus the geometry that produced it.
#[derive(Clone, Debug)]
pub struct NormalizedBoard {
    pub image: ColorImage,
    /// Source corners in `[TL, TR, BR, BL]` order.
    pub corners: CornerSet,
    /// Maps rectified pixel coordinates (edge convention) to source image.
    pub h_img_from_rect: Homography,
}

impl NormalizedBoard {
    pub fn width(&self) -> usize {
        self.image.width
    }

    pub fn height(&self) -> usize {
        self.image.height
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, corners), fields(w = params.width, h = params.height))
)]
pub fn normalize_board(
    image: &ColorImageView<'_>,
    corners: &CornerSet,
    params: &NormalizerParams,
) -> Result<NormalizedBoard, NormalizeError> {
    let (w, h) = (params.width, params.height);
    if w == 0 || h == 0 {
        return Err(NormalizeError::InvalidSize {
            width: w,
            height: h,
        });
    }

    let ordered = corners.canonical();
    if ordered.has_colinear_triple() {
        return Err(NormalizeError::Colinear);
    }

    // corner pixels are centres; the warp works in edge coordinates
    let src = ordered.points.map(|p| Point2::new(p.x + 0.5, p.y + 0.5));
    let rect = [
        Point2::new(0.0, 0.0),
        Point2::new(w as f32, 0.0),
        Point2::new(w as f32, h as f32),
        Point2::new(0.0, h as f32),
    ];
    let h_img_from_rect = homography_from_4pt(&rect, &src).ok_or(NormalizeError::Singular)?;

    let warped = warp_perspective_rgb(image, h_img_from_rect, w, h);
    debug!(
        "normalize: {:?} -> {}x{}",
        ordered.points.map(|p| (p.x.round() as i32, p.y.round() as i32)),
        w,
        h
    );

    Ok(NormalizedBoard {
        image: warped,
        corners: ordered,
        h_img_from_rect,
    })
}
