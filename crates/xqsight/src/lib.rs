//! Xiangqi screen assistant.
//!
//! This crate provides:
//! - re-exports of the pipeline crates (`core`, `board`, `position`,
//!   `classify`, `engine`)
//! - [`Recognizer`]: screenshot to validated [`position::PositionRecord`],
//!   with `auto`, `deep` and `heuristic` strategies
//! - [`Orchestrator`]: one attempt at a time, keeps the last known position
//!   and asks the engine only when it changes
//! - [`Scheduler`]: periodic attempts on a worker thread
//! - [`AssistantConfig`]: JSON configuration
//!
//! ## Quickstart
//!
//! ```no_run
//! use xqsight::{load_color_image, AssistantConfig, Recognizer, Strategy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = AssistantConfig {
//!     strategy: Strategy::Heuristic,
//!     ..AssistantConfig::default()
//! };
//! let recognizer = Recognizer::from_config(&cfg);
//! let img = load_color_image("screenshot.png")?;
//! let record = recognizer.recognize_record(&img.view())?;
//! println!("{record}");
//! # Ok(())
//! # }
//! ```

pub use xqsight_board as board;
pub use xqsight_classify as classify;
pub use xqsight_core as core;
pub use xqsight_engine as engine;
pub use xqsight_position as position;

mod capture;
mod config;
mod error;
mod orchestrator;
mod recognizer;
mod scheduler;

pub use capture::{crop_region, ScreenCapture};
#[cfg(feature = "image")]
pub use capture::{color_image_from_rgb, load_color_image, save_color_image, FileCapture};
#[cfg(feature = "screen")]
pub use capture::XcapCapture;
pub use config::{AssistantConfig, CaptureConfig, FailurePolicy, Strategy, MIN_INTERVAL_MS};
pub use error::{CaptureError, ConfigError, RecognitionFailure, Stage};
pub use orchestrator::{
    AttemptReport, AttemptStatus, Orchestrator, Suggestion, DEBUG_ALIGNED, DEBUG_ORIGINAL,
};
pub use recognizer::{Pipeline, Recognition, RecognitionAttempt, Recognizer, StageTiming};
pub use scheduler::{Scheduler, Snapshot, REPORT_BACKLOG};
