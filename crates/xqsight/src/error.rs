use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use xqsight_board::{LocateError, NormalizeError, PartitionError};
use xqsight_classify::ClassifyError;
use xqsight_engine::AnalysisError;
use xqsight_position::PositionError;

/// Steps of one recognition attempt, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Capture,
    Localize,
    Normalize,
    Partition,
    Classify,
    Encode,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Capture => "capture",
            Self::Localize => "localize",
            Self::Normalize => "normalize",
            Self::Partition => "partition",
            Self::Classify => "classify",
            Self::Encode => "encode",
            Self::Analyze => "analyze",
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("failed to read image {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("screen capture failed: {0}")]
    Screen(String),
    #[error("captured frame is empty")]
    Empty,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Why an attempt did not produce a usable position.
#[derive(thiserror::Error, Debug)]
pub enum RecognitionFailure {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("board not found: {0}")]
    Localization(LocateError),
    #[error("board normalization failed: {0}")]
    Normalization(#[from] NormalizeError),
    #[error("cell partition failed: {0}")]
    Partition(#[from] PartitionError),
    /// No classifier strategy could run (missing weights, feature disabled).
    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(String),
    #[error("classification failed: {0}")]
    Classification(ClassifyError),
    #[error("recognized position {record} is invalid: {source}")]
    EncodingInvalid {
        record: String,
        /// Cells that were downgraded to empty for low confidence.
        low_confidence: usize,
        #[source]
        source: PositionError,
    },
    #[error("engine analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),
    #[error("engine analysis failed: {0}")]
    AnalysisProcess(AnalysisError),
}

impl From<LocateError> for RecognitionFailure {
    fn from(e: LocateError) -> Self {
        match e {
            // The learned locator abstains the same way a learned classifier does.
            LocateError::Unavailable(why) => Self::ClassificationUnavailable(why),
            other => Self::Localization(other),
        }
    }
}

impl From<ClassifyError> for RecognitionFailure {
    fn from(e: ClassifyError) -> Self {
        match e {
            ClassifyError::Unavailable(why) => Self::ClassificationUnavailable(why),
            other => Self::Classification(other),
        }
    }
}

impl From<AnalysisError> for RecognitionFailure {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Timeout(d) => Self::AnalysisTimeout(d),
            other => Self::AnalysisProcess(other),
        }
    }
}

impl RecognitionFailure {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Capture(_) => Stage::Capture,
            Self::Localization(_) => Stage::Localize,
            Self::Normalization(_) => Stage::Normalize,
            Self::Partition(_) => Stage::Partition,
            Self::ClassificationUnavailable(_) | Self::Classification(_) => Stage::Classify,
            Self::EncodingInvalid { .. } => Stage::Encode,
            Self::AnalysisTimeout(_) | Self::AnalysisProcess(_) => Stage::Analyze,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ClassificationUnavailable(_))
    }

    /// Short text for the status line.
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Capture(_) | Self::Localization(_) | Self::Normalization(_) | Self::Partition(_) => {
                "board not found"
            }
            Self::ClassificationUnavailable(_) => "recognition model unavailable",
            Self::Classification(_) => "recognition failed",
            Self::EncodingInvalid { low_confidence, .. } if *low_confidence > 0 => {
                "recognition confidence too low"
            }
            Self::EncodingInvalid { .. } => "recognized position is invalid",
            Self::AnalysisTimeout(_) => "engine analysis timed out",
            Self::AnalysisProcess(_) => "engine unavailable",
        }
    }
}
