use crate::{BoardReading, CellReading, ClassifyError};
use log::debug;
use xqsight_board::{CellGrid, NormalizedBoard, FILES, RANKS};
use xqsight_core::ColorImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A strategy that turns a normalized board into 90 cell readings.
///
/// Per-cell strategies look at `cells`; whole-board models look at
/// `board.image` and ignore the crops.
pub trait PieceClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn classify(
        &self,
        board: &NormalizedBoard,
        cells: &CellGrid,
    ) -> Result<BoardReading, ClassifyError>;
}

/// A strategy that looks at one cell crop at a time.
pub trait CellClassifier: Send + Sync {
    fn name(&self) -> &str;
    fn classify_cell(&self, row: usize, col: usize, cell: &ColorImage) -> CellReading;
}

/// Lifts a [`CellClassifier`] to a [`PieceClassifier`].
#[derive(Clone, Debug)]
pub struct PerCell<C>(pub C);

impl<C: CellClassifier> PieceClassifier for PerCell<C> {
    fn name(&self) -> &str {
        self.0.name()
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(classifier = self.0.name())))]
    fn classify(
        &self,
        _board: &NormalizedBoard,
        cells: &CellGrid,
    ) -> Result<BoardReading, ClassifyError> {
        if cells.len() != FILES * RANKS {
            return Err(ClassifyError::CellCount(cells.len()));
        }
        let cells = cells
            .iter()
            .map(|((row, col), cell)| self.0.classify_cell(row, col, cell))
            .collect();
        Ok(BoardReading {
            classifier: self.0.name().to_owned(),
            cells,
        })
    }
}

/// Tries strategies in order, moving on only when one is unavailable.
///
/// Any other error, and any successful reading (however unconfident), ends
/// the chain.
pub struct FallbackChain {
    name: String,
    links: Vec<Box<dyn PieceClassifier>>,
}

impl FallbackChain {
    pub fn new(links: Vec<Box<dyn PieceClassifier>>) -> Self {
        let name = links
            .iter()
            .map(|l| l.name())
            .collect::<Vec<_>>()
            .join(" > ");
        Self { name, links }
    }
}

impl PieceClassifier for FallbackChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(
        &self,
        board: &NormalizedBoard,
        cells: &CellGrid,
    ) -> Result<BoardReading, ClassifyError> {
        let mut reasons = Vec::new();
        for link in &self.links {
            match link.classify(board, cells) {
                Err(ClassifyError::Unavailable(why)) => {
                    debug!("classifier {} unavailable: {why}", link.name());
                    reasons.push(format!("{}: {why}", link.name()));
                }
                other => return other,
            }
        }
        Err(ClassifyError::Unavailable(if reasons.is_empty() {
            "no classifiers configured".to_owned()
        } else {
            reasons.join("; ")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Point2};
    use xqsight_board::{partition_cells, CornerSet, PartitionParams};
    use xqsight_core::Homography;

    struct Fixed(&'static str, Result<f32, ClassifyError>);

    impl PieceClassifier for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn classify(&self, _: &NormalizedBoard, _: &CellGrid) -> Result<BoardReading, ClassifyError> {
            self.1.clone().map(|conf| BoardReading {
                classifier: self.0.to_owned(),
                cells: vec![CellReading::empty(conf); 90],
            })
        }
    }

    fn board() -> (NormalizedBoard, CellGrid) {
        let image = ColorImage::new(90, 100);
        let cells = partition_cells(&image.view(), &PartitionParams::default()).unwrap();
        let corners = CornerSet::new([
            Point2::new(0.0, 0.0),
            Point2::new(90.0, 0.0),
            Point2::new(90.0, 100.0),
            Point2::new(0.0, 100.0),
        ]);
        let board = NormalizedBoard {
            image,
            corners,
            h_img_from_rect: Homography::new(Matrix3::identity()),
        };
        (board, cells)
    }

    #[test]
    fn chain_skips_only_unavailable_links() {
        let (b, c) = board();
        let chain = FallbackChain::new(vec![
            Box::new(Fixed("deep", Err(ClassifyError::Unavailable("no weights".into())))),
            Box::new(Fixed("color", Ok(0.25))),
            Box::new(Fixed("never", Ok(1.0))),
        ]);
        assert_eq!(chain.name(), "deep > color > never");
        let reading = chain.classify(&b, &c).unwrap();
        assert_eq!(reading.classifier, "color");
    }

    #[test]
    fn chain_stops_on_hard_errors() {
        let (b, c) = board();
        let chain = FallbackChain::new(vec![
            Box::new(Fixed("deep", Err(ClassifyError::CellCount(3)))),
            Box::new(Fixed("color", Ok(0.25))),
        ]);
        assert_eq!(chain.classify(&b, &c).unwrap_err(), ClassifyError::CellCount(3));
    }

    #[test]
    fn all_unavailable_reports_every_reason() {
        let (b, c) = board();
        let chain = FallbackChain::new(vec![
            Box::new(Fixed("a", Err(ClassifyError::Unavailable("x".into())))),
            Box::new(Fixed("b", Err(ClassifyError::Unavailable("y".into())))),
        ]);
        assert_eq!(
            chain.classify(&b, &c).unwrap_err(),
            ClassifyError::Unavailable("a: x; b: y".into())
        );
    }
}
