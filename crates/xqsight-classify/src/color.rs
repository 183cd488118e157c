//! Occupancy from piece ink color.
//!
//! Red pieces are drawn in saturated red, black pieces in near-black ink.
//! A cell is occupied when enough of its pixels fall in either band; the
//! larger band picks the side. The kind cannot be told from color, so every
//! occupied cell gets a placeholder pawn flagged as guessed.

use crate::{CellClassifier, CellReading};
use serde::{Deserialize, Serialize};
use xqsight_core::{rgb_to_hsv, ColorImage, HsvRange};
use xqsight_position::{PieceKind, PieceSymbol, Side};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorHeuristicParams {
    /// Hue wraps around 0, so red needs two bands.
    pub red_bands: Vec<HsvRange>,
    pub dark_band: HsvRange,
    /// Minimum fraction of cell pixels in a band to call the cell occupied.
    pub occupancy_frac: f32,
}

impl Default for ColorHeuristicParams {
    fn default() -> Self {
        Self {
            red_bands: vec![
                HsvRange::new([0, 100, 100], [10, 255, 255]),
                HsvRange::new([160, 100, 100], [180, 255, 255]),
            ],
            dark_band: HsvRange::new([0, 0, 0], [180, 255, 50]),
            occupancy_frac: 0.10,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ColorHeuristic {
    pub params: ColorHeuristicParams,
}

/// Fractions of red and dark pixels in a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InkFractions {
    pub red: f32,
    pub dark: f32,
}

impl ColorHeuristic {
    pub fn new(params: ColorHeuristicParams) -> Self {
        Self { params }
    }

    pub fn ink_fractions(&self, cell: &ColorImage) -> InkFractions {
        let total = cell.width * cell.height;
        if total == 0 {
            return InkFractions {
                red: 0.0,
                dark: 0.0,
            };
        }
        let (mut red, mut dark) = (0usize, 0usize);
        for px in cell.data.chunks_exact(3) {
            let hsv = rgb_to_hsv([px[0], px[1], px[2]]);
            if self.params.red_bands.iter().any(|b| b.contains(hsv)) {
                red += 1;
            }
            if self.params.dark_band.contains(hsv) {
                dark += 1;
            }
        }
        InkFractions {
            red: red as f32 / total as f32,
            dark: dark as f32 / total as f32,
        }
    }
}

impl CellClassifier for ColorHeuristic {
    fn name(&self) -> &str {
        "color"
    }

    fn classify_cell(&self, _row: usize, _col: usize, cell: &ColorImage) -> CellReading {
        let f = self.ink_fractions(cell);
        let thr = self.params.occupancy_frac.max(f32::EPSILON);
        let strongest = f.red.max(f.dark);
        if strongest < thr {
            return CellReading::empty(1.0 - strongest / thr);
        }
        let side = if f.red > f.dark { Side::Red } else { Side::Black };
        let confidence = strongest / (f.red + f.dark);
        CellReading::piece(PieceSymbol::new(side, PieceKind::Pawn), confidence).guessed()
    }
}
