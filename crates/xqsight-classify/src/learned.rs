//! Two-stage learned recognizer.
//!
//! 1. [`KeypointLocator`]: a pose model sees the whole screenshot at
//!    `pose_input` resolution and emits one horizontal and one vertical score
//!    distribution per board corner (SimCC). The best bin on each axis,
//!    rescaled to image size, is the corner.
//! 2. [`LearnedClassifier`]: a classifier sees the normalized board at
//!    `classifier_input` resolution and emits a `[1, 90, 16]` score tensor,
//!    one distribution per board point over [`CLASS_LABELS`].

use crate::backend::{image_to_nchw, InferenceBackend, Normalization, Tensor};
use crate::{BackendError, BoardReading, CellReading, ClassifyError, PieceClassifier};
use log::{debug, info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use xqsight_board::{BoardLocator, CellGrid, CornerSet, LocateError, NormalizedBoard};
use xqsight_core::ColorImageView;
use xqsight_position::{PieceSymbol, FILES, RANKS};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Classifier output classes, in model order. `point` is an empty point,
/// `other` is anything unrecognized (treated as empty).
pub const CLASS_LABELS: [&str; 16] = [
    "point", "other", "K", "A", "B", "N", "R", "C", "P", "k", "a", "b", "n", "r", "c", "p",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
    pub pose_file: String,
    pub classifier_file: String,
    /// `[width, height]` of the pose model input.
    pub pose_input: [usize; 2],
    /// `[width, height]` of the classifier input.
    pub classifier_input: [usize; 2],
    pub min_confidence: f32,
    /// `[width, height]` the board is rectified to before classification.
    pub board_size: [usize; 2],
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models/cchess_recognition"),
            pose_file: "swinv2-nano_cchess16.onnx".to_owned(),
            classifier_file: "rtmpose-t-cchess_4.onnx".to_owned(),
            pose_input: [256, 256],
            classifier_input: [280, 315],
            min_confidence: 0.5,
            board_size: [400, 450],
        }
    }
}

impl ModelConfig {
    pub fn pose_path(&self) -> PathBuf {
        self.dir.join(&self.pose_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier_file)
    }
}

/// Backends for both stages. Either may be missing; the matching stage then
/// reports itself unavailable.
#[derive(Clone, Default)]
pub struct LearnedModels {
    pub pose: Option<Arc<dyn InferenceBackend>>,
    pub classifier: Option<Arc<dyn InferenceBackend>>,
    /// Why a missing backend is missing.
    pub unavailable: Vec<String>,
}

impl LearnedModels {
    /// Load both ONNX models named by `cfg`. Never fails: missing files or a
    /// build without the `onnx` feature leave the backend empty.
    pub fn load(cfg: &ModelConfig) -> Self {
        let mut out = Self::default();
        match load_backend(cfg.pose_path(), cfg.pose_input) {
            Ok(b) => out.pose = Some(b),
            Err(why) => out.unavailable.push(format!("pose model: {why}")),
        }
        match load_backend(cfg.classifier_path(), cfg.classifier_input) {
            Ok(b) => out.classifier = Some(b),
            Err(why) => out.unavailable.push(format!("classifier model: {why}")),
        }
        for why in &out.unavailable {
            warn!("{why}");
        }
        out
    }

    fn reason(&self) -> String {
        if self.unavailable.is_empty() {
            "model not loaded".to_owned()
        } else {
            self.unavailable.join("; ")
        }
    }

    pub fn locator(&self, cfg: &ModelConfig) -> KeypointLocator {
        KeypointLocator {
            backend: self.pose.clone(),
            input: cfg.pose_input,
            reason: self.reason(),
        }
    }

    pub fn classifier(&self, cfg: &ModelConfig) -> LearnedClassifier {
        LearnedClassifier {
            backend: self.classifier.clone(),
            input: cfg.classifier_input,
            min_confidence: cfg.min_confidence,
            reason: self.reason(),
        }
    }
}

#[cfg(feature = "onnx")]
fn load_backend(path: PathBuf, input: [usize; 2]) -> Result<Arc<dyn InferenceBackend>, String> {
    crate::backend::OnnxBackend::load(&path, input[0], input[1])
        .map(|b| Arc::new(b) as Arc<dyn InferenceBackend>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "onnx"))]
fn load_backend(path: PathBuf, _input: [usize; 2]) -> Result<Arc<dyn InferenceBackend>, String> {
    if !path.is_file() {
        return Err(BackendError::ModelNotFound(path).to_string());
    }
    Err(format!(
        "{} found but onnx support is not compiled in",
        path.display()
    ))
}

/// Index of the largest score; first wins on ties.
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

/// Decode SimCC outputs `[1, K, Bx]` and `[1, K, By]` into the first four
/// keypoints, scaled to an `image_w x image_h` image.
pub fn decode_simcc(
    simcc_x: &Tensor,
    simcc_y: &Tensor,
    image_w: usize,
    image_h: usize,
) -> Result<[Point2<f32>; 4], BackendError> {
    let rows_x: Vec<&[f32]> = simcc_x.last_axis_rows().collect();
    let rows_y: Vec<&[f32]> = simcc_y.last_axis_rows().collect();
    if rows_x.len() < 4 || rows_y.len() < 4 {
        return Err(BackendError::Output(format!(
            "expected 4 keypoints, got shapes {:?} / {:?}",
            simcc_x.shape, simcc_y.shape
        )));
    }

    let mut out = [Point2::origin(); 4];
    for (k, p) in out.iter_mut().enumerate() {
        let (bins_x, bins_y) = (rows_x[k].len(), rows_y[k].len());
        let (ix, _) = argmax(rows_x[k]).ok_or_else(|| BackendError::Output("empty simcc_x".into()))?;
        let (iy, _) = argmax(rows_y[k]).ok_or_else(|| BackendError::Output("empty simcc_y".into()))?;
        *p = Point2::new(
            (ix * image_w / bins_x) as f32,
            (iy * image_h / bins_y) as f32,
        );
    }
    Ok(out)
}

fn is_distribution(row: &[f32]) -> bool {
    let sum: f32 = row.iter().sum();
    row.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-2
}

fn softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|v| v / sum).collect()
}

/// Turn per-point class scores into readings. Rows that are not already
/// probability distributions are passed through a softmax first.
pub fn decode_board_scores(scores: &Tensor, min_confidence: f32) -> Result<Vec<CellReading>, BackendError> {
    let rows: Vec<&[f32]> = scores.last_axis_rows().collect();
    if rows.len() != FILES * RANKS || rows.iter().any(|r| r.len() != CLASS_LABELS.len()) {
        return Err(BackendError::Output(format!(
            "expected [1, 90, 16] scores, got {:?}",
            scores.shape
        )));
    }

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        if row.iter().any(|v| !v.is_finite()) {
            cells.push(CellReading {
                symbol: None,
                confidence: 0.0,
                low_confidence: true,
                guessed: false,
            });
            continue;
        }
        let probs = if is_distribution(row) {
            row.to_vec()
        } else {
            softmax(row)
        };
        let (class, conf) = argmax(&probs).unwrap_or((0, 0.0));
        let symbol = CLASS_LABELS[class]
            .chars()
            .next()
            .filter(|_| class >= 2)
            .and_then(PieceSymbol::from_char);

        let reading = match symbol {
            Some(_) if conf.is_nan() || conf < min_confidence => CellReading {
                symbol: None,
                confidence: conf,
                low_confidence: true,
                guessed: false,
            },
            Some(s) => CellReading::piece(s, conf),
            None => CellReading::empty(conf),
        };
        cells.push(reading);
    }
    Ok(cells)
}

/// Board corners from the pose model.
pub struct KeypointLocator {
    backend: Option<Arc<dyn InferenceBackend>>,
    input: [usize; 2],
    reason: String,
}

impl KeypointLocator {
    pub fn new(backend: Arc<dyn InferenceBackend>, input: [usize; 2]) -> Self {
        Self {
            backend: Some(backend),
            input,
            reason: String::new(),
        }
    }
}

impl BoardLocator for KeypointLocator {
    fn name(&self) -> &str {
        "keypoints"
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn locate(&self, image: &ColorImageView<'_>) -> Result<CornerSet, LocateError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| LocateError::Unavailable(self.reason.clone()))?;
        let input = image_to_nchw(image, self.input[0], self.input[1], &Normalization::IMAGENET_UNIT);
        let outputs = backend
            .run(input)
            .map_err(|e| LocateError::Inference(e.to_string()))?;
        let [x, y, ..] = outputs.as_slice() else {
            return Err(LocateError::Inference(format!(
                "pose model returned {} outputs, expected 2",
                outputs.len()
            )));
        };
        let points = decode_simcc(x, y, image.width, image.height)
            .map_err(|e| LocateError::Inference(e.to_string()))?;
        debug!("keypoints: {points:?}");
        Ok(CornerSet::new(points))
    }
}

/// Whole-board piece classifier.
pub struct LearnedClassifier {
    backend: Option<Arc<dyn InferenceBackend>>,
    input: [usize; 2],
    min_confidence: f32,
    reason: String,
}

impl LearnedClassifier {
    pub fn new(backend: Arc<dyn InferenceBackend>, input: [usize; 2], min_confidence: f32) -> Self {
        Self {
            backend: Some(backend),
            input,
            min_confidence,
            reason: String::new(),
        }
    }
}

impl PieceClassifier for LearnedClassifier {
    fn name(&self) -> &str {
        "learned"
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn classify(
        &self,
        board: &NormalizedBoard,
        _cells: &CellGrid,
    ) -> Result<BoardReading, ClassifyError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| ClassifyError::Unavailable(self.reason.clone()))?;
        let input = image_to_nchw(&board.image.view(), self.input[0], self.input[1], &Normalization::IMAGENET_BYTE);
        let outputs = backend.run(input)?;
        let scores = outputs
            .first()
            .ok_or_else(|| BackendError::Output("classifier returned no outputs".into()))?;
        let cells = decode_board_scores(scores, self.min_confidence)?;

        let reading = BoardReading {
            classifier: self.name().to_owned(),
            cells,
        };
        info!(
            "learned: {} pieces, mean confidence {:.2}, {} low-confidence points",
            reading.cells.iter().filter(|c| c.symbol.is_some()).count(),
            reading.mean_confidence(),
            reading.low_confidence_count()
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xqsight_position::{PieceKind, Side};

    fn one_hot_rows(rows: usize, bins: usize, hot: &[usize]) -> Tensor {
        let mut data = vec![0.0; rows * bins];
        for (r, &h) in hot.iter().enumerate() {
            data[r * bins + h] = 1.0;
        }
        Tensor::new(vec![1, rows, bins], data).unwrap()
    }

    #[test]
    fn simcc_argmax_is_rescaled_to_the_image() {
        let x = one_hot_rows(4, 512, &[10, 500, 500, 10]);
        let y = one_hot_rows(4, 512, &[20, 20, 480, 480]);
        let pts = decode_simcc(&x, &y, 1024, 768).unwrap();
        assert_eq!(pts[0], Point2::new(20.0, 30.0));
        assert_eq!(pts[1], Point2::new(1000.0, 30.0));
        assert_eq!(pts[2], Point2::new(1000.0, 720.0));
    }

    #[test]
    fn simcc_needs_four_keypoints() {
        let x = one_hot_rows(3, 8, &[1, 2, 3]);
        assert!(decode_simcc(&x, &x, 10, 10).is_err());
    }

    fn scores(hot: impl Fn(usize) -> (usize, f32)) -> Tensor {
        let mut data = vec![0.0; 90 * 16];
        for i in 0..90 {
            let (class, p) = hot(i);
            let rest = (1.0 - p) / 15.0;
            for c in 0..16 {
                data[i * 16 + c] = if c == class { p } else { rest };
            }
        }
        Tensor::new(vec![1, 90, 16], data).unwrap()
    }

    #[test]
    fn class_scores_decode_to_symbols() {
        let t = scores(|i| match i {
            4 => (9, 0.9),   // k
            85 => (2, 0.95), // K
            10 => (1, 0.99), // other
            20 => (8, 0.3),  // P, too weak
            _ => (0, 0.8),
        });
        let cells = decode_board_scores(&t, 0.5).unwrap();
        assert_eq!(cells[4].symbol, Some(PieceSymbol::new(Side::Black, PieceKind::King)));
        assert_eq!(cells[85].symbol, Some(PieceSymbol::new(Side::Red, PieceKind::King)));
        assert_eq!(cells[10].symbol, None);
        assert!(!cells[10].low_confidence);
        assert_eq!(cells[20].symbol, None);
        assert!(cells[20].low_confidence);
        assert_eq!(cells.iter().filter(|c| c.low_confidence).count(), 1);
    }

    #[test]
    fn logits_go_through_softmax() {
        let mut data = vec![-2.0; 90 * 16];
        for i in 0..90 {
            data[i * 16 + 13] = 5.0; // r
        }
        let t = Tensor::new(vec![1, 90, 16], data).unwrap();
        let cells = decode_board_scores(&t, 0.5).unwrap();
        assert!(cells.iter().all(|c| c.symbol == Some(PieceSymbol::new(Side::Black, PieceKind::Rook))));
        assert!(cells[0].confidence > 0.9 && cells[0].confidence <= 1.0);
    }

    #[test]
    fn non_finite_scores_are_low_confidence_empty() {
        let mut data = vec![0.0; 90 * 16];
        for i in 0..90 {
            data[i * 16] = 1.0;
        }
        data[3 * 16 + 9] = f32::NAN;
        data[7 * 16 + 2] = f32::INFINITY;
        let t = Tensor::new(vec![1, 90, 16], data).unwrap();
        let cells = decode_board_scores(&t, 0.5).unwrap();
        for i in [3, 7] {
            assert_eq!(cells[i].symbol, None);
            assert!(cells[i].low_confidence);
            assert_eq!(cells[i].confidence, 0.0);
        }
        assert!(cells.iter().all(|c| c.confidence.is_finite()));
        assert_eq!(cells.iter().filter(|c| c.low_confidence).count(), 2);
    }

    #[test]
    fn wrong_score_shape_is_an_error() {
        let t = Tensor::new(vec![1, 89, 16], vec![0.0; 89 * 16]).unwrap();
        assert!(decode_board_scores(&t, 0.5).is_err());
    }

    struct Canned(Tensor);

    impl InferenceBackend for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn run(&self, input: Tensor) -> Result<Vec<Tensor>, BackendError> {
            assert_eq!(input.shape, vec![1, 3, 315, 280]);
            Ok(vec![self.0.clone()])
        }
    }

    #[test]
    fn learned_classifier_reads_the_whole_board() {
        use nalgebra::Matrix3;
        use xqsight_board::{partition_cells, PartitionParams};
        use xqsight_core::{ColorImage, Homography};

        let t = scores(|i| if i == 0 { (6, 0.7) } else { (0, 0.9) });
        let clf = LearnedClassifier::new(Arc::new(Canned(t)), [280, 315], 0.5);
        let image = ColorImage::new(400, 450);
        let cells = partition_cells(&image.view(), &PartitionParams::default()).unwrap();
        let board = NormalizedBoard {
            image,
            corners: CornerSet::new([Point2::origin(); 4]),
            h_img_from_rect: Homography::new(Matrix3::identity()),
        };
        let reading = clf.classify(&board, &cells).unwrap();
        assert_eq!(reading.classifier, "learned");
        assert_eq!(reading.grid().occupied(), 1);
        assert_eq!(reading.get(0, 0).symbol, Some(PieceSymbol::new(Side::Red, PieceKind::Rook)));
    }

    #[test]
    fn missing_models_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            dir: dir.path().to_path_buf(),
            ..ModelConfig::default()
        };
        let models = LearnedModels::load(&cfg);
        assert!(models.pose.is_none() && models.classifier.is_none());
        assert_eq!(models.unavailable.len(), 2);

        let img = xqsight_core::ColorImage::new(40, 40);
        let err = models.locator(&cfg).locate(&img.view()).unwrap_err();
        assert!(matches!(err, LocateError::Unavailable(_)));
        assert!(!err.is_not_found());
    }
}
