//! One recognition attempt at a time, with the last known position.

use crate::capture::ScreenCapture;
use crate::recognizer::{Recognizer, StageTiming};
use crate::{AssistantConfig, CaptureError, FailurePolicy, RecognitionFailure, Stage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use xqsight_core::ColorImage;
use xqsight_engine::{analyze_both_sides, Analysis, AnalysisError, Analyzer, BestMove, Score, UciAnalyzer};
use xqsight_position::{describe_move, Grid, PositionRecord, Side};

pub const DEBUG_ORIGINAL: &str = "debug_board_original.png";
pub const DEBUG_ALIGNED: &str = "debug_aligned_board.png";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// A valid record was recognized.
    Valid,
    /// A record was produced but failed validation.
    Invalid,
    /// An earlier stage failed.
    Failed,
}

/// The engine's answer for one side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub side: Side,
    pub best: Option<BestMove>,
    /// Traditional notation, e.g. `炮二平五`.
    pub description: Option<String>,
    /// `h2 -> e2`
    pub coordinates: Option<String>,
    pub score: Option<Score>,
    pub error: Option<String>,
}

impl Suggestion {
    fn from_result(side: Side, result: Result<Analysis, AnalysisError>, grid: &Grid) -> Self {
        match result {
            Ok(a) => {
                let (description, coordinates) = match a.best {
                    BestMove::Move(mv) => (
                        describe_move(&mv, grid).ok(),
                        Some(mv.coordinate_text()),
                    ),
                    BestMove::NoMove => (None, None),
                };
                Self {
                    side,
                    best: Some(a.best),
                    description,
                    coordinates,
                    score: a.score,
                    error: None,
                }
            }
            Err(e) => {
                let failure = RecognitionFailure::from(e);
                warn!("analysis for {side} failed: {failure}");
                Self {
                    side,
                    best: None,
                    description: None,
                    coordinates: None,
                    score: None,
                    error: Some(failure.to_string()),
                }
            }
        }
    }

    /// `h2e2 | 炮二平五 | h2 -> e2`
    pub fn summary(&self) -> String {
        match (&self.best, &self.error) {
            (Some(BestMove::Move(mv)), _) => {
                let mut parts = vec![mv.to_string()];
                parts.extend(self.description.clone());
                parts.extend(self.coordinates.clone());
                parts.join(" | ")
            }
            (Some(BestMove::NoMove), _) => "no move".to_owned(),
            (None, Some(e)) => e.clone(),
            (None, None) => "no answer".to_owned(),
        }
    }
}

/// What happened during one attempt. Serializable for `--report`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub status: AttemptStatus,
    pub failed_stage: Option<Stage>,
    pub failure: Option<String>,
    /// Plain status line for the user.
    pub status_text: String,
    pub pipeline: Option<String>,
    /// Record used by this attempt: the recognized one, or the opening when
    /// substituted. `None` when withheld.
    pub record: Option<PositionRecord>,
    pub substituted: bool,
    /// `record` differs from the previously retained one.
    pub changed: bool,
    pub low_confidence_cells: usize,
    pub guessed_cells: usize,
    pub mean_confidence: Option<f32>,
    pub suggestions: Vec<Suggestion>,
    pub timings: Vec<StageTiming>,
    pub total_ms: f64,
}

impl AttemptReport {
    fn new() -> Self {
        Self {
            status: AttemptStatus::Failed,
            failed_stage: None,
            failure: None,
            status_text: String::new(),
            pipeline: None,
            record: None,
            substituted: false,
            changed: false,
            low_confidence_cells: 0,
            guessed_cells: 0,
            mean_confidence: None,
            suggestions: Vec::new(),
            timings: Vec::new(),
            total_ms: 0.0,
        }
    }

    pub fn analyzed(&self) -> bool {
        !self.suggestions.is_empty()
    }
}

pub struct Orchestrator {
    recognizer: Recognizer,
    analyzer: Option<Box<dyn Analyzer>>,
    policy: FailurePolicy,
    both_sides: bool,
    debug_dir: Option<PathBuf>,
    last_record: Option<PositionRecord>,
    /// Opening analyzed by the last substitution, so repeated failures do
    /// not re-run the engine. Never becomes `last_record`.
    last_substitute: Option<PositionRecord>,
}

impl Orchestrator {
    pub fn new(recognizer: Recognizer) -> Self {
        Self {
            recognizer,
            analyzer: None,
            policy: FailurePolicy::Withhold,
            both_sides: false,
            debug_dir: None,
            last_record: None,
            last_substitute: None,
        }
    }

    /// Recognizer, policy and debug output from `cfg`; a UCI analyzer when
    /// `cfg.analyze` is set.
    pub fn from_config(cfg: &AssistantConfig) -> Self {
        let mut o = Self::new(Recognizer::from_config(cfg))
            .with_policy(cfg.failure_policy)
            .with_both_sides(cfg.both_sides);
        o.debug_dir = cfg.debug_dir.clone();
        if cfg.analyze {
            o.analyzer = Some(Box::new(UciAnalyzer::new(cfg.engine.clone())));
        }
        o
    }

    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_both_sides(mut self, both_sides: bool) -> Self {
        self.both_sides = both_sides;
        self
    }

    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    pub fn last_record(&self) -> Option<&PositionRecord> {
        self.last_record.as_ref()
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn recognizer_mut(&mut self) -> &mut Recognizer {
        &mut self.recognizer
    }

    pub fn attempt_capture(&mut self, capture: &mut dyn ScreenCapture) -> AttemptReport {
        let t = Instant::now();
        let frame = capture.capture();
        let mut report = self.attempt(frame);
        report.timings.insert(
            0,
            StageTiming {
                stage: Stage::Capture,
                ms: t.elapsed().as_secs_f64() * 1e3 - report.total_ms,
            },
        );
        report.total_ms = t.elapsed().as_secs_f64() * 1e3;
        report
    }

    /// Run the pipeline on `frame`. Never panics on a stage failure; every
    /// failure ends up in the report.
    pub fn attempt(&mut self, frame: Result<ColorImage, CaptureError>) -> AttemptReport {
        let started = Instant::now();
        let mut report = AttemptReport::new();

        match frame {
            Err(e) => self.handle_failure(RecognitionFailure::from(e), &mut report),
            Ok(frame) => {
                self.save_debug(DEBUG_ORIGINAL, &frame);
                let attempt = self.recognizer.recognize(&frame.view());
                if let Some(board) = &attempt.board {
                    self.save_debug(DEBUG_ALIGNED, &board.image);
                }
                report.timings = attempt.timings;
                match attempt.outcome {
                    Ok(rec) => {
                        report.status = AttemptStatus::Valid;
                        report.pipeline = Some(rec.pipeline);
                        report.low_confidence_cells = rec.reading.low_confidence_count();
                        report.guessed_cells = rec.reading.guessed_count();
                        report.mean_confidence = Some(rec.reading.mean_confidence());
                        self.accept(rec.record, &rec.grid, &mut report);
                    }
                    Err(failure) => self.handle_failure(failure, &mut report),
                }
            }
        }

        report.total_ms = started.elapsed().as_secs_f64() * 1e3;
        report
    }

    fn handle_failure(&mut self, failure: RecognitionFailure, report: &mut AttemptReport) {
        warn!("attempt failed at {}: {failure}", failure.stage());
        report.status = match failure {
            RecognitionFailure::EncodingInvalid { .. } => AttemptStatus::Invalid,
            _ => AttemptStatus::Failed,
        };
        report.failed_stage = Some(failure.stage());
        report.failure = Some(failure.to_string());
        report.status_text = failure.status_text().to_owned();

        match self.policy {
            FailurePolicy::Withhold => {
                debug!("keeping previous position, no analysis");
            }
            FailurePolicy::SubstituteOpening => self.substitute(report),
        }
    }

    /// Analyze the opening in place of the failed read. The retained record
    /// stays as it was.
    fn substitute(&mut self, report: &mut AttemptReport) {
        let record = PositionRecord::opening().with_side(self.recognizer.side_to_move());
        report.substituted = true;
        report.record = Some(record.clone());
        report.status_text = format!("{}; using the opening position", report.status_text);
        if self.last_substitute.as_ref() == Some(&record) {
            return;
        }
        self.last_substitute = Some(record.clone());
        self.analyze(&record, &Grid::standard_opening(), report);
    }

    /// Retain `record` and analyze it if it changed.
    fn accept(&mut self, record: PositionRecord, grid: &Grid, report: &mut AttemptReport) {
        report.changed = self.last_record.as_ref() != Some(&record);
        report.record = Some(record.clone());
        if !report.changed {
            report.status_text = "position unchanged".to_owned();
            return;
        }
        info!("new position {record}");
        report.status_text = "position recognized".to_owned();
        self.last_record = Some(record.clone());
        self.last_substitute = None;
        self.analyze(&record, grid, report);
    }

    fn analyze(&mut self, record: &PositionRecord, grid: &Grid, report: &mut AttemptReport) {
        let Some(analyzer) = self.analyzer.as_mut() else {
            return;
        };
        let t = Instant::now();
        report.suggestions = if self.both_sides {
            let both = analyze_both_sides(analyzer.as_mut(), record);
            vec![
                Suggestion::from_result(Side::Red, both.red, grid),
                Suggestion::from_result(Side::Black, both.black, grid),
            ]
        } else {
            vec![Suggestion::from_result(
                record.side_to_move(),
                analyzer.analyze(record),
                grid,
            )]
        };
        report.timings.push(StageTiming {
            stage: Stage::Analyze,
            ms: t.elapsed().as_secs_f64() * 1e3,
        });
        if let Some(err) = report.suggestions.iter().find_map(|s| s.error.as_ref()) {
            report.failed_stage = Some(Stage::Analyze);
            report.failure = Some(err.clone());
        }
    }

    fn save_debug(&self, name: &str, image: &ColorImage) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        #[cfg(feature = "image")]
        {
            let path = dir.join(name);
            let saved = std::fs::create_dir_all(dir)
                .map_err(|e| e.to_string())
                .and_then(|_| crate::capture::save_color_image(image, &path).map_err(|e| e.to_string()));
            match saved {
                Ok(()) => debug!("saved {}", path.display()),
                Err(e) => warn!("could not save {}: {e}", path.display()),
            }
        }
        #[cfg(not(feature = "image"))]
        {
            let _ = (image, name);
            warn!("debug images in {} need the `image` feature", dir.display());
        }
    }
}
