use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("engine executable not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to start engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("engine process error: {0}")]
    Process(String),
    #[error("unexpected engine output: {0}")]
    Protocol(String),
}

impl AnalysisError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        Self::Process(e.to_string())
    }
}
