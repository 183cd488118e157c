use serde::{Deserialize, Serialize};
use xqsight_position::{Grid, PieceSymbol, FILES, RANKS};

/// Verdict for one board point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellReading {
    /// `None` is an empty point.
    pub symbol: Option<PieceSymbol>,
    /// Score of the chosen answer in `[0, 1]`.
    pub confidence: f32,
    /// The classifier ran but its best answer was under the threshold; the
    /// point was downgraded to empty.
    pub low_confidence: bool,
    /// The piece kind is a default rather than evidence (placeholder or
    /// prior fallback).
    pub guessed: bool,
}

impl CellReading {
    pub fn empty(confidence: f32) -> Self {
        Self {
            symbol: None,
            confidence,
            low_confidence: false,
            guessed: false,
        }
    }

    pub fn piece(symbol: PieceSymbol, confidence: f32) -> Self {
        Self {
            symbol: Some(symbol),
            confidence,
            low_confidence: false,
            guessed: false,
        }
    }

    pub fn guessed(mut self) -> Self {
        self.guessed = true;
        self
    }
}

/// 90 readings in row-major order plus the name of the strategy that made
/// them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardReading {
    pub classifier: String,
    pub cells: Vec<CellReading>,
}

impl BoardReading {
    pub fn get(&self, row: usize, col: usize) -> &CellReading {
        &self.cells[row * FILES + col]
    }

    pub fn grid(&self) -> Grid {
        let mut g = Grid::empty();
        for (i, c) in self.cells.iter().enumerate().take(FILES * RANKS) {
            g.set(i / FILES, i % FILES, c.symbol);
        }
        g
    }

    pub fn low_confidence_count(&self) -> usize {
        self.cells.iter().filter(|c| c.low_confidence).count()
    }

    pub fn guessed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.guessed).count()
    }

    pub fn mean_confidence(&self) -> f32 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().map(|c| c.confidence).sum::<f32>() / self.cells.len() as f32
    }
}
