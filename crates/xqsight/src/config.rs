//! JSON configuration for the assistant.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use xqsight_board::{LocatorParams, NormalizerParams, PartitionParams};
use xqsight_classify::{ColorHeuristicParams, ModelConfig, PositionPriorParams};
use xqsight_engine::EngineConfig;
use xqsight_position::Side;

/// Which recognition pipelines to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Strategy {
    /// Learned models first; heuristics only when the models are unavailable.
    #[default]
    Auto,
    /// Learned models only.
    Deep,
    /// Contour localizer with color and opening-layout heuristics.
    Heuristic,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Deep => "deep",
            Self::Heuristic => "heuristic",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "deep" => Ok(Self::Deep),
            "heuristic" => Ok(Self::Heuristic),
            other => Err(format!("unknown strategy '{other}' (expected auto, deep or heuristic)")),
        }
    }
}

/// What the orchestrator does when an attempt yields no valid position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the previous position and skip analysis.
    #[default]
    Withhold,
    /// Use the standard opening instead. For demos and tests.
    SubstituteOpening,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// `[x, y, width, height]` of the screen area holding the board.
    pub region: Option<[u32; 4]>,
    /// Capture from this image file instead of the screen.
    pub image_path: Option<PathBuf>,
}

/// Shortest interval between scheduled attempts.
pub const MIN_INTERVAL_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub strategy: Strategy,
    /// Never observed on screen; the user supplies it.
    pub side_to_move: Side,
    pub interval_ms: u64,
    pub failure_policy: FailurePolicy,
    /// Ask the engine for every new position.
    pub analyze: bool,
    /// Ask for both sides' best move instead of only `side_to_move`.
    pub both_sides: bool,
    /// Where to save the captured frame and the aligned board.
    pub debug_dir: Option<PathBuf>,
    pub localizer: LocatorParams,
    pub normalizer: NormalizerParams,
    pub partition: PartitionParams,
    pub color: ColorHeuristicParams,
    pub prior: PositionPriorParams,
    pub model: ModelConfig,
    pub engine: EngineConfig,
    pub capture: CaptureConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            side_to_move: Side::Red,
            interval_ms: 2_500,
            failure_policy: FailurePolicy::Withhold,
            analyze: true,
            both_sides: false,
            debug_dir: None,
            localizer: LocatorParams::default(),
            normalizer: NormalizerParams::default(),
            partition: PartitionParams::default(),
            color: ColorHeuristicParams::default(),
            prior: PositionPriorParams::default(),
            model: ModelConfig::default(),
            engine: EngineConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms < MIN_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "interval_ms must be at least {MIN_INTERVAL_MS}, got {}",
                self.interval_ms
            )));
        }
        Ok(())
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// `interval_ms`, raised to [`MIN_INTERVAL_MS`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }
}
