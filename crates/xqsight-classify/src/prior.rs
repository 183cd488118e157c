//! Piece kinds from the standard opening layout.
//!
//! Wraps a side-only classifier (usually [`crate::ColorHeuristic`]). Occupied
//! points that are opening slots of the detected side get that slot's kind;
//! any other occupied point becomes a pawn flagged as guessed. Ranks that are
//! empty in the opening (black's second rank and red's second rank by
//! default) are forced empty whatever the color says. This is only accurate
//! near the starting position.

use crate::{CellClassifier, CellReading};
use serde::{Deserialize, Serialize};
use xqsight_core::ColorImage;
use xqsight_position::{opening_kind, PieceKind, PieceSymbol, Side, RANKS};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionPriorParams {
    pub forced_empty_rows: Vec<usize>,
}

impl Default for PositionPriorParams {
    fn default() -> Self {
        Self {
            forced_empty_rows: vec![1, 8],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PositionPrior<C> {
    pub inner: C,
    pub params: PositionPriorParams,
}

impl<C> PositionPrior<C> {
    pub fn new(inner: C, params: PositionPriorParams) -> Self {
        Self { inner, params }
    }
}

fn opening_side(row: usize) -> Side {
    if row < RANKS / 2 {
        Side::Black
    } else {
        Side::Red
    }
}

/// Apply the opening prior to a side-only reading of `(row, col)`.
pub fn apply_prior(params: &PositionPriorParams, row: usize, col: usize, seen: CellReading) -> CellReading {
    let Some(symbol) = seen.symbol else {
        return seen;
    };

    if params.forced_empty_rows.contains(&row) {
        return CellReading {
            symbol: None,
            guessed: true,
            ..seen
        };
    }

    match opening_kind(row, col) {
        Some(kind) if opening_side(row) == symbol.side => CellReading {
            symbol: Some(PieceSymbol::new(symbol.side, kind)),
            guessed: false,
            ..seen
        },
        _ => CellReading {
            symbol: Some(PieceSymbol::new(symbol.side, PieceKind::Pawn)),
            guessed: true,
            ..seen
        },
    }
}

impl<C: CellClassifier> CellClassifier for PositionPrior<C> {
    fn name(&self) -> &str {
        "position-prior"
    }

    fn classify_cell(&self, row: usize, col: usize, cell: &ColorImage) -> CellReading {
        apply_prior(&self.params, row, col, self.inner.classify_cell(row, col, cell))
    }
}
