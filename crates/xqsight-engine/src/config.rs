use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Network file looked up next to the engine when `eval_file` is unset.
pub const DEFAULT_EVAL_FILE: &str = "pikafish.nnue";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub path: PathBuf,
    /// Defaults to the directory holding the executable; engines resolve
    /// their network file relative to it.
    pub working_dir: Option<PathBuf>,
    /// Sent as `setoption name EvalFile value <path>`.
    pub eval_file: Option<PathBuf>,
    pub depth: u32,
    pub timeout_ms: u64,
    pub quit_grace_ms: u64,
    /// Extra `setoption` pairs, sent in order after `EvalFile`.
    pub options: Vec<(String, String)>,
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("engine/pikafish"),
            working_dir: None,
            eval_file: None,
            depth: 8,
            timeout_ms: 15_000,
            quit_grace_ms: 1_000,
            options: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.quit_grace_ms)
    }

    /// Executable path made absolute against the current directory, so it
    /// still names the same file once the child runs in its working dir.
    pub fn resolved_path(&self) -> PathBuf {
        absolute(&self.path)
    }

    /// Explicit `working_dir` (absolute), else the executable's directory.
    pub fn resolved_working_dir(&self) -> Option<PathBuf> {
        match &self.working_dir {
            Some(dir) => Some(absolute(dir)),
            None => self.resolved_path().parent().map(Path::to_path_buf),
        }
    }

    /// Explicit `eval_file`, else `pikafish.nnue` beside the engine if present.
    pub fn resolved_eval_file(&self) -> Option<PathBuf> {
        if let Some(p) = &self.eval_file {
            return Some(p.clone());
        }
        let candidate = self.resolved_working_dir()?.join(DEFAULT_EVAL_FILE);
        candidate.is_file().then(|| candidate.canonicalize().unwrap_or(candidate))
    }

    /// `setoption` lines sent after `uciok`.
    pub fn setoption_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(eval) = self.resolved_eval_file() {
            lines.push(format!("setoption name EvalFile value {}", eval.display()));
        }
        for (name, value) in &self.options {
            lines.push(format!("setoption name {name} value {value}"));
        }
        lines
    }
}
