use crate::PartitionError;
use serde::{Deserialize, Serialize};
use xqsight_core::{ColorImage, ColorImageView, PixelRect};

#[cfg(feature = "tracing")]
use tracing::instrument;

pub const FILES: usize = 9;
pub const RANKS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionParams {
    /// Fraction of the cell trimmed from each side to keep grid lines out.
    pub inset_frac: f32,
}

impl Default for PartitionParams {
    fn default() -> Self {
        Self { inset_frac: 0.2 }
    }
}

/// 90 cell crops in row-major order, row 0 nearest black.
#[derive(Clone, Debug)]
pub struct CellGrid {
    cells: Vec<ColorImage>,
    rects: Vec<PixelRect>,
}

impl CellGrid {
    pub fn get(&self, row: usize, col: usize) -> &ColorImage {
        &self.cells[row * FILES + col]
    }

    pub fn rect(&self, row: usize, col: usize) -> PixelRect {
        self.rects[row * FILES + col]
    }

    /// `((row, col), cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &ColorImage)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| ((i / FILES, i % FILES), c))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Un-inset bounds of cell `(row, col)`: `col * (W / 9)` to `(col + 1) * (W / 9)`
/// with integer division, same for rows.
pub fn cell_bounds(width: usize, height: usize, row: usize, col: usize) -> PixelRect {
    let cw = width / FILES;
    let ch = height / RANKS;
    PixelRect {
        x: col * cw,
        y: row * ch,
        width: cw,
        height: ch,
    }
}

fn inset(rect: PixelRect, frac: f32) -> PixelRect {
    let shrink = |len: usize| {
        let d = (len as f32 * frac).floor() as usize;
        // keep at least one pixel
        d.min(len.saturating_sub(1) / 2)
    };
    let dx = shrink(rect.width);
    let dy = shrink(rect.height);
    PixelRect {
        x: rect.x + dx,
        y: rect.y + dy,
        width: rect.width - 2 * dx,
        height: rect.height - 2 * dy,
    }
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(board), fields(w = board.width, h = board.height))
)]
pub fn partition_cells(
    board: &ColorImageView<'_>,
    params: &PartitionParams,
) -> Result<CellGrid, PartitionError> {
    if board.width < FILES || board.height < RANKS {
        return Err(PartitionError::TooSmall {
            width: board.width,
            height: board.height,
        });
    }
    if !(0.0..0.5).contains(&params.inset_frac) {
        return Err(PartitionError::InvalidInset(params.inset_frac));
    }

    let mut cells = Vec::with_capacity(FILES * RANKS);
    let mut rects = Vec::with_capacity(FILES * RANKS);
    for row in 0..RANKS {
        for col in 0..FILES {
            let r = inset(
                cell_bounds(board.width, board.height, row, col),
                params.inset_frac,
            );
            cells.push(board.crop(r));
            rects.push(r);
        }
    }
    Ok(CellGrid { cells, rects })
}
