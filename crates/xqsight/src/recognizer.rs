//! Screenshot to position record.

use crate::{AssistantConfig, RecognitionFailure, Stage, Strategy};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use xqsight_board::{
    normalize_board, partition_cells, BoardLocator, ContourLocator, CornerSet, NormalizedBoard,
    NormalizerParams, PartitionParams, FILES, RANKS,
};
use xqsight_classify::{
    BoardReading, ClassifyError, ColorHeuristic, FallbackChain, LearnedModels, PerCell,
    PieceClassifier, PositionPrior,
};
use xqsight_core::ColorImageView;
use xqsight_position::{encode_position, Grid, PositionRecord, Side};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub ms: f64,
}

/// One locator, the board size it normalizes to and the classifier that
/// reads the result.
pub struct Pipeline {
    pub locator: Box<dyn BoardLocator + Send + Sync>,
    pub normalizer: NormalizerParams,
    pub classifier: Box<dyn PieceClassifier>,
}

impl Pipeline {
    pub fn new(
        locator: impl BoardLocator + Send + Sync + 'static,
        normalizer: NormalizerParams,
        classifier: impl PieceClassifier + 'static,
    ) -> Self {
        Self {
            locator: Box::new(locator),
            normalizer,
            classifier: Box::new(classifier),
        }
    }

    pub fn name(&self) -> String {
        format!("{} + {}", self.locator.name(), self.classifier.name())
    }
}

/// A validated recognition.
#[derive(Clone, Debug)]
pub struct Recognition {
    pub pipeline: String,
    /// Canonical `[TL, TR, BR, BL]`.
    pub corners: CornerSet,
    pub reading: BoardReading,
    pub grid: Grid,
    pub record: PositionRecord,
}

/// Everything one call to [`Recognizer::recognize`] produced.
#[derive(Debug)]
pub struct RecognitionAttempt {
    pub outcome: Result<Recognition, RecognitionFailure>,
    /// The last board that got normalized, kept for debug output even when a
    /// later stage failed.
    pub board: Option<NormalizedBoard>,
    pub timings: Vec<StageTiming>,
}

/// Runs its pipelines in order. The next pipeline is tried only when the
/// current one reports itself unavailable; a pipeline that runs and fails
/// ends the attempt.
pub struct Recognizer {
    pipelines: Vec<Pipeline>,
    partition: PartitionParams,
    side_to_move: Side,
}

impl Recognizer {
    pub fn new(pipelines: Vec<Pipeline>, partition: PartitionParams, side_to_move: Side) -> Self {
        Self {
            pipelines,
            partition,
            side_to_move,
        }
    }

    /// Build the pipelines for `cfg.strategy`. Model files are loaded here;
    /// missing ones make the learned stages unavailable rather than failing.
    pub fn from_config(cfg: &AssistantConfig) -> Self {
        let heuristic = || {
            PerCell(PositionPrior::new(
                ColorHeuristic::new(cfg.color.clone()),
                cfg.prior.clone(),
            ))
        };
        let contour = || ContourLocator::new(cfg.localizer.clone());
        let learned_board = NormalizerParams {
            width: cfg.model.board_size[0],
            height: cfg.model.board_size[1],
        };

        let pipelines = match cfg.strategy {
            Strategy::Heuristic => vec![Pipeline::new(contour(), cfg.normalizer, heuristic())],
            Strategy::Deep => {
                let models = LearnedModels::load(&cfg.model);
                vec![Pipeline::new(
                    models.locator(&cfg.model),
                    learned_board,
                    models.classifier(&cfg.model),
                )]
            }
            Strategy::Auto => {
                let models = LearnedModels::load(&cfg.model);
                let links: Vec<Box<dyn PieceClassifier>> = vec![
                    Box::new(models.classifier(&cfg.model)),
                    Box::new(heuristic()),
                ];
                let fallback = FallbackChain::new(links);
                vec![
                    Pipeline::new(
                        models.locator(&cfg.model),
                        learned_board,
                        models.classifier(&cfg.model),
                    ),
                    Pipeline::new(contour(), cfg.normalizer, fallback),
                ]
            }
        };
        info!(
            "strategy {}: {}",
            cfg.strategy,
            pipelines.iter().map(Pipeline::name).collect::<Vec<_>>().join(", then ")
        );
        Self::new(pipelines, cfg.partition, cfg.side_to_move)
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn set_side_to_move(&mut self, side: Side) {
        self.side_to_move = side;
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = image.width, height = image.height))
    )]
    pub fn recognize(&self, image: &ColorImageView<'_>) -> RecognitionAttempt {
        let mut attempt = RecognitionAttempt {
            outcome: Err(RecognitionFailure::ClassificationUnavailable(
                "no pipelines configured".into(),
            )),
            board: None,
            timings: Vec::new(),
        };
        let mut unavailable = Vec::new();
        for pipeline in &self.pipelines {
            match self.run(pipeline, image, &mut attempt) {
                Err(RecognitionFailure::ClassificationUnavailable(why)) => {
                    debug!("pipeline {} unavailable: {why}", pipeline.name());
                    unavailable.push(why);
                }
                outcome => {
                    attempt.outcome = outcome;
                    return attempt;
                }
            }
        }
        if !unavailable.is_empty() {
            attempt.outcome = Err(RecognitionFailure::ClassificationUnavailable(
                unavailable.join("; "),
            ));
        }
        attempt
    }

    /// [`Recognizer::recognize`] reduced to the record.
    pub fn recognize_record(
        &self,
        image: &ColorImageView<'_>,
    ) -> Result<PositionRecord, RecognitionFailure> {
        self.recognize(image).outcome.map(|r| r.record)
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        image: &ColorImageView<'_>,
        attempt: &mut RecognitionAttempt,
    ) -> Result<Recognition, RecognitionFailure> {
        let mut clock = Instant::now();
        let mut lap = |stage: Stage, timings: &mut Vec<StageTiming>| {
            let now = Instant::now();
            timings.push(StageTiming {
                stage,
                ms: (now - clock).as_secs_f64() * 1e3,
            });
            clock = now;
        };

        let corners = pipeline.locator.locate(image)?.canonical();
        lap(Stage::Localize, &mut attempt.timings);
        debug!("{} corners: {:?}", pipeline.locator.name(), corners.points);

        let board = normalize_board(image, &corners, &pipeline.normalizer)?;
        lap(Stage::Normalize, &mut attempt.timings);

        let cells = partition_cells(&board.image.view(), &self.partition)?;
        lap(Stage::Partition, &mut attempt.timings);

        let classified = pipeline.classifier.classify(&board, &cells);
        attempt.board = Some(board);
        let reading = classified?;
        if reading.cells.len() != FILES * RANKS {
            return Err(ClassifyError::CellCount(reading.cells.len()).into());
        }
        lap(Stage::Classify, &mut attempt.timings);

        let grid = reading.grid();
        let record = encode_position(&grid, self.side_to_move).map_err(|source| {
            RecognitionFailure::EncodingInvalid {
                record: PositionRecord::encode(&grid, self.side_to_move).to_string(),
                low_confidence: reading.low_confidence_count(),
                source,
            }
        })?;
        lap(Stage::Encode, &mut attempt.timings);

        info!(
            "recognized {record} via {} (mean confidence {:.2}, {} low, {} guessed)",
            pipeline.name(),
            reading.mean_confidence(),
            reading.low_confidence_count(),
            reading.guessed_count()
        );
        Ok(Recognition {
            pipeline: pipeline.name(),
            corners,
            reading,
            grid,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use xqsight_board::{CellGrid, LocateError};
    use xqsight_classify::CellReading;
    use xqsight_core::ColorImage;

    struct FixedCorners(Option<[Point2<f32>; 4]>);

    impl BoardLocator for FixedCorners {
        fn name(&self) -> &str {
            "fixed"
        }

        fn locate(&self, _: &ColorImageView<'_>) -> Result<CornerSet, LocateError> {
            self.0
                .map(CornerSet::new)
                .ok_or_else(|| LocateError::Unavailable("no model".into()))
        }
    }

    /// Reads the opening layout, or the given grid.
    struct Layout(Option<Grid>);

    impl PieceClassifier for Layout {
        fn name(&self) -> &str {
            "layout"
        }

        fn classify(&self, _: &NormalizedBoard, _: &CellGrid) -> Result<BoardReading, ClassifyError> {
            let grid = self.0.unwrap_or_else(Grid::standard_opening);
            let cells = grid
                .rows()
                .iter()
                .flatten()
                .map(|c| match c {
                    Some(p) => CellReading::piece(*p, 0.9),
                    None => CellReading::empty(0.9),
                })
                .collect();
            Ok(BoardReading {
                classifier: "layout".into(),
                cells,
            })
        }
    }

    fn square() -> Option<[Point2<f32>; 4]> {
        Some([
            Point2::new(100.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 110.0),
            Point2::new(100.0, 110.0),
        ])
    }

    fn small() -> NormalizerParams {
        NormalizerParams {
            width: 90,
            height: 100,
        }
    }

    #[test]
    fn first_available_pipeline_wins() {
        let img = ColorImage::new(120, 120);
        let r = Recognizer::new(
            vec![
                Pipeline::new(FixedCorners(None), small(), Layout(None)),
                Pipeline::new(FixedCorners(square()), small(), Layout(None)),
            ],
            PartitionParams::default(),
            Side::Red,
        );
        let rec = r.recognize(&img.view()).outcome.unwrap();
        assert_eq!(rec.pipeline, "fixed + layout");
        assert_eq!(rec.record, PositionRecord::opening());
        // canonical order regardless of what the locator emitted
        assert_eq!(rec.corners.points[0], Point2::new(10.0, 10.0));
    }

    #[test]
    fn all_unavailable_is_classification_unavailable() {
        let img = ColorImage::new(120, 120);
        let r = Recognizer::new(
            vec![Pipeline::new(FixedCorners(None), small(), Layout(None))],
            PartitionParams::default(),
            Side::Red,
        );
        let attempt = r.recognize(&img.view());
        assert!(attempt.board.is_none());
        assert!(attempt.outcome.unwrap_err().is_unavailable());
    }

    #[test]
    fn invalid_grid_is_an_encoding_failure() {
        let img = ColorImage::new(120, 120);
        let r = Recognizer::new(
            vec![Pipeline::new(FixedCorners(square()), small(), Layout(Some(Grid::empty())))],
            PartitionParams::default(),
            Side::Black,
        );
        let attempt = r.recognize(&img.view());
        assert!(attempt.board.is_some());
        match attempt.outcome.unwrap_err() {
            RecognitionFailure::EncodingInvalid { record, .. } => {
                assert_eq!(record, "9/9/9/9/9/9/9/9/9/9 b - - 0 1")
            }
            other => panic!("unexpected {other:?}"),
        }
        let stages: Vec<Stage> = attempt.timings.iter().map(|t| t.stage).collect();
        assert_eq!(
            stages,
            [Stage::Localize, Stage::Normalize, Stage::Partition, Stage::Classify]
        );
    }

    #[test]
    fn heuristic_strategy_has_one_pipeline() {
        let cfg = AssistantConfig {
            strategy: Strategy::Heuristic,
            ..AssistantConfig::default()
        };
        let r = Recognizer::from_config(&cfg);
        assert_eq!(r.pipelines.len(), 1);
        assert_eq!(r.pipelines[0].name(), "contour + position-prior");
    }
}
