//! Core image types and utilities for xiangqi board recognition.
//!
//! Everything here is independent of any concrete decoder or screen-capture
//! backend: images are plain RGB8 / gray buffers, geometry is `nalgebra`.

mod color;
mod homography;
mod image;
mod logger;

pub use color::{rgb_to_hsv, Hsv, HsvRange};
pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_rgb, sample_bilinear_u8, ColorImage, ColorImageView,
    GrayImage, GrayImageView, PixelRect,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
