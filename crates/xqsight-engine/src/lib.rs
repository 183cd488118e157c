//! Analysis collaborator: a UCI-speaking xiangqi engine run as a child
//! process.
//!
//! ```no_run
//! use xqsight_engine::{Analyzer, EngineConfig, UciAnalyzer};
//! use xqsight_position::PositionRecord;
//!
//! let mut engine = UciAnalyzer::new(EngineConfig::with_path("engine/pikafish"));
//! let analysis = engine.analyze(&PositionRecord::opening())?;
//! println!("best move: {}", analysis.best);
//! # Ok::<(), xqsight_engine::AnalysisError>(())
//! ```

mod analyzer;
mod config;
mod error;
mod process;
mod uci;

pub use analyzer::{analyze_both_sides, Analyzer, BothSides, UciAnalyzer};
pub use config::{EngineConfig, DEFAULT_EVAL_FILE};
pub use error::AnalysisError;
pub use process::{Analysis, UciEngine};
pub use uci::{parse_bestmove, parse_info, BestMove, InfoLine, Score};
