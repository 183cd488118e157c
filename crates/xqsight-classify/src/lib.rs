//! Piece classification for a normalized xiangqi board.
//!
//! Every strategy implements [`PieceClassifier`] and yields a
//! [`BoardReading`] of 90 [`CellReading`]s. Strategies can be swapped or
//! stacked in a [`FallbackChain`]:
//!
//! - [`LearnedClassifier`]: ONNX board classifier (needs the `onnx` feature
//!   and model files).
//! - [`PerCell`] over [`PositionPrior`] over [`ColorHeuristic`]: color ink
//!   occupancy with kinds taken from the opening layout.
//!
//! [`KeypointLocator`] is the learned counterpart of the contour locator in
//! `xqsight-board`.

mod backend;
mod classifier;
mod color;
mod error;
mod learned;
mod prior;
mod reading;

pub use backend::{image_to_nchw, InferenceBackend, Normalization, Tensor};
#[cfg(feature = "onnx")]
pub use backend::OnnxBackend;
pub use classifier::{CellClassifier, FallbackChain, PerCell, PieceClassifier};
pub use color::{ColorHeuristic, ColorHeuristicParams, InkFractions};
pub use error::{BackendError, ClassifyError};
pub use learned::{
    decode_board_scores, decode_simcc, KeypointLocator, LearnedClassifier, LearnedModels,
    ModelConfig, CLASS_LABELS,
};
pub use prior::{apply_prior, PositionPrior, PositionPriorParams};
pub use reading::{BoardReading, CellReading};
