//! Board geometry stages of the recognition pipeline.
//!
//! 1. [`locate_board`] finds the board outline in a screenshot and returns
//!    its four corners ([`CornerSet`]).
//! 2. [`normalize_board`] orders the corners and warps the board to a fixed
//!    top-down image ([`NormalizedBoard`]), black at row 0.
//! 3. [`partition_cells`] cuts the normalized board into the 9x10 cells the
//!    classifiers look at.
//!
//! ```no_run
//! use xqsight_board::{locate_board, normalize_board, partition_cells};
//! use xqsight_board::{LocatorParams, NormalizerParams, PartitionParams};
//! # fn demo(img: &xqsight_core::ColorImage) -> Result<(), Box<dyn std::error::Error>> {
//! let corners = locate_board(&img.view(), &LocatorParams::default())?;
//! let board = normalize_board(&img.view(), &corners, &NormalizerParams::default())?;
//! let cells = partition_cells(&board.image.view(), &PartitionParams::default())?;
//! assert_eq!(cells.len(), 90);
//! # Ok(())
//! # }
//! ```

mod contour;
mod error;
mod locate;
mod normalize;
mod partition;
mod threshold;

pub use contour::{approx_poly_closed, arc_length_closed, find_external_contours, polygon_area, Contour};
pub use error::{LocateError, NormalizeError, PartitionError};
pub use locate::{locate_board, validate_quad, BoardLocator, ContourLocator, CornerSet, LocatorParams};
pub use normalize::{normalize_board, NormalizedBoard, NormalizerParams};
pub use partition::{cell_bounds, partition_cells, CellGrid, PartitionParams, FILES, RANKS};
pub use threshold::{adaptive_threshold_gaussian_inv, binarize, otsu_threshold, ThresholdMode};
