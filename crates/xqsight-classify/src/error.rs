use std::path::PathBuf;

/// Failures of an inference backend (model loading or execution).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("inference failed: {0}")]
    Run(String),
    #[error("unexpected model output: {0}")]
    Output(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// The strategy cannot run at all (no weights, feature disabled). Fallback
    /// chains move on to the next strategy only for this variant.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("expected 90 cells, got {0}")]
    CellCount(usize),
}

impl ClassifyError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
