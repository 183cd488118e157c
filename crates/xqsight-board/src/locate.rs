//! Board localization: find the four corners of the board in a screenshot.

use crate::contour::{approx_poly_closed, find_external_contours, polygon_area};
use crate::threshold::{binarize, ThresholdMode};
use crate::LocateError;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use xqsight_core::ColorImageView;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Four board corners in image pixel coordinates.
///
/// Order is whatever the producer emitted; use [`CornerSet::canonical`] to get
/// `[top-left, top-right, bottom-right, bottom-left]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet {
    pub points: [Point2<f32>; 4],
}

impl CornerSet {
    pub fn new(points: [Point2<f32>; 4]) -> Self {
        Self { points }
    }

    /// Sort by `(y, x)`; the first two are the top pair, the last two the
    /// bottom pair, each pair then ordered left to right.
    ///
    /// The result does not depend on the input order.
    pub fn canonical(&self) -> Self {
        let mut p = self.points;
        p.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        let (tl, tr) = if p[0].x.total_cmp(&p[1].x).is_le() {
            (p[0], p[1])
        } else {
            (p[1], p[0])
        };
        let (bl, br) = if p[2].x.total_cmp(&p[3].x).is_le() {
            (p[2], p[3])
        } else {
            (p[3], p[2])
        };
        Self::new([tl, tr, br, bl])
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.points).abs()
    }

    /// `true` if any three of the four points are (nearly) colinear.
    pub fn has_colinear_triple(&self) -> bool {
        const SIN_TOL: f32 = 1e-4;
        let p = &self.points;
        for skip in 0..4 {
            let idx: Vec<usize> = (0..4).filter(|&i| i != skip).collect();
            let (a, b, c) = (p[idx[0]], p[idx[1]], p[idx[2]]);
            let ab = b - a;
            let ac = c - a;
            let bc = c - b;
            let scale = ab.norm().max(ac.norm()).max(bc.norm());
            if scale <= f32::EPSILON {
                return true;
            }
            let min_side = ab.norm().min(ac.norm()).min(bc.norm());
            if min_side <= 1e-3 {
                return true;
            }
            let cross = ab.x * ac.y - ab.y * ac.x;
            if cross.abs() <= SIN_TOL * scale * scale {
                return true;
            }
        }
        false
    }
}

/// Anything that can find the board in a screenshot.
pub trait BoardLocator {
    fn name(&self) -> &str;
    fn locate(&self, image: &ColorImageView<'_>) -> Result<CornerSet, LocateError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    pub threshold: ThresholdMode,
    /// Polygon tolerance as a fraction of the contour perimeter.
    pub epsilon_frac: f32,
    /// Reject contours enclosing less than this fraction of the image.
    pub min_area_frac: f32,
    pub min_angle_deg: f32,
    pub max_angle_deg: f32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            threshold: ThresholdMode::default(),
            epsilon_frac: 0.02,
            min_area_frac: 0.01,
            min_angle_deg: 10.0,
            max_angle_deg: 170.0,
        }
    }
}

/// Classic vision locator: binarize, take the largest external contour and
/// accept it if it simplifies to a sane quadrilateral.
#[derive(Clone, Debug, Default)]
pub struct ContourLocator {
    pub params: LocatorParams,
}

impl ContourLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }
}

impl BoardLocator for ContourLocator {
    fn name(&self) -> &str {
        "contour"
    }

    fn locate(&self, image: &ColorImageView<'_>) -> Result<CornerSet, LocateError> {
        locate_board(image, &self.params)
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(image, params), fields(w = image.width, h = image.height))
)]
pub fn locate_board(
    image: &ColorImageView<'_>,
    params: &LocatorParams,
) -> Result<CornerSet, LocateError> {
    let gray = image.to_gray();
    let mask = binarize(&gray.view(), &params.threshold);
    let contours = find_external_contours(&mask.view());
    debug!("locate: {} external contours", contours.len());

    let (area, best) = contours
        .iter()
        .map(|c| (c.area(), c))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .ok_or(LocateError::NoContour)?;

    let min_area = (params.min_area_frac * (image.width * image.height) as f32).max(1.0);
    if area < min_area {
        return Err(LocateError::TooSmall { area, min_area });
    }

    let eps = params.epsilon_frac * best.perimeter();
    let poly = approx_poly_closed(&best.points, eps);
    debug!(
        "locate: largest contour area={area:.0} perimeter={:.0} -> {} vertices",
        best.perimeter(),
        poly.len()
    );
    if poly.len() != 4 {
        return Err(LocateError::NotQuadrilateral {
            vertices: poly.len(),
        });
    }

    let corners = CornerSet::new([poly[0], poly[1], poly[2], poly[3]]);
    validate_quad(&corners, params)?;
    Ok(corners)
}

/// Reject quads that would produce a nonsensical perspective transform.
pub fn validate_quad(corners: &CornerSet, params: &LocatorParams) -> Result<(), LocateError> {
    let p = &corners.points;
    if corners.area() <= 1.0 {
        return Err(LocateError::ZeroArea);
    }

    let mut sign = 0.0f32;
    for i in 0..4 {
        let prev = p[(i + 3) % 4];
        let cur = p[i];
        let next = p[(i + 1) % 4];
        let a = prev - cur;
        let b = next - cur;

        let cross = (cur - prev).x * (next - cur).y - (cur - prev).y * (next - cur).x;
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return Err(LocateError::NotConvex);
        }

        let cos = (a.dot(&b) / (a.norm() * b.norm())).clamp(-1.0, 1.0);
        let angle_deg = cos.acos().to_degrees();
        if !(params.min_angle_deg..=params.max_angle_deg).contains(&angle_deg) {
            return Err(LocateError::AngleOutOfRange {
                angle_deg,
                min_deg: params.min_angle_deg,
                max_deg: params.max_angle_deg,
            });
        }
    }
    Ok(())
}
