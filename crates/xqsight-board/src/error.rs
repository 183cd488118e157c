/// Reasons the board could not be located in a screenshot.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("no contour found")]
    NoContour,
    #[error("largest contour too small (area={area:.0}, min={min_area:.0})")]
    TooSmall { area: f32, min_area: f32 },
    #[error("largest contour approximates to {vertices} vertices, expected 4")]
    NotQuadrilateral { vertices: usize },
    #[error("quadrilateral has zero area")]
    ZeroArea,
    #[error("quadrilateral is not convex")]
    NotConvex,
    #[error("corner angle {angle_deg:.1} deg outside [{min_deg}, {max_deg}]")]
    AngleOutOfRange {
        angle_deg: f32,
        min_deg: f32,
        max_deg: f32,
    },
    /// The locator has no model or backend to run.
    #[error("board locator unavailable: {0}")]
    Unavailable(String),
    #[error("board locator inference failed: {0}")]
    Inference(String),
}

impl LocateError {
    /// `true` for every variant that means "looked, found nothing usable".
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::Unavailable(_) | Self::Inference(_))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("corners are degenerate: three or more are colinear")]
    Colinear,
    #[error("perspective transform is singular")]
    Singular,
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: usize, height: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("board image {width}x{height} is too small for a 9x10 grid")]
    TooSmall { width: usize, height: usize },
    #[error("inset fraction {0} outside [0, 0.5)")]
    InvalidInset(f32),
}
