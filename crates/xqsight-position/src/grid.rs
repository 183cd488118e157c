use crate::{PieceKind, PieceSymbol, Side};
use serde::{Deserialize, Serialize};

pub const FILES: usize = 9;
pub const RANKS: usize = 10;

/// Occupancy of every board point.
///
/// Row-major, row 0 is the rank nearest black, column 0 is file `a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Option<PieceSymbol>; FILES]; RANKS],
}

const BACK_RANK: [PieceKind; FILES] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Advisor,
    PieceKind::King,
    PieceKind::Advisor,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Piece kind on `(row, col)` in the standard opening, ignoring side.
pub fn opening_kind(row: usize, col: usize) -> Option<PieceKind> {
    match row {
        0 | 9 => BACK_RANK.get(col).copied(),
        2 | 7 if col == 1 || col == 7 => Some(PieceKind::Cannon),
        3 | 6 if col % 2 == 0 && col < FILES => Some(PieceKind::Pawn),
        _ => None,
    }
}

impl Grid {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard_opening() -> Self {
        let mut g = Self::empty();
        for row in 0..RANKS {
            let side = if row < RANKS / 2 { Side::Black } else { Side::Red };
            for col in 0..FILES {
                if let Some(kind) = opening_kind(row, col) {
                    g.set(row, col, Some(PieceSymbol::new(side, kind)));
                }
            }
        }
        g
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<PieceSymbol> {
        self.cells[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Option<PieceSymbol>) {
        self.cells[row][col] = cell;
    }

    pub fn rows(&self) -> &[[Option<PieceSymbol>; FILES]; RANKS] {
        &self.cells
    }

    /// Occupied points as `((row, col), piece)` in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = ((usize, usize), PieceSymbol)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.map(|p| ((r, c), p)))
        })
    }

    pub fn count(&self, piece: PieceSymbol) -> usize {
        self.pieces().filter(|(_, p)| *p == piece).count()
    }

    pub fn king_count(&self, side: Side) -> usize {
        self.count(PieceSymbol::new(side, PieceKind::King))
    }

    pub fn occupied(&self) -> usize {
        self.pieces().count()
    }

    /// Multi-line text board with piece glyphs, `·` for empty points, ranks
    /// labelled 9..0 and files a..i.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (r, row) in self.cells.iter().enumerate() {
            out.push_str(&format!("{} ", RANKS - 1 - r));
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    out.push(' ');
                }
                out.push(cell.map_or('·', |p| p.glyph()));
            }
            out.push('\n');
            if r == RANKS / 2 - 1 {
                out.push_str("  ~~~~~~~~~~~~~~~~~\n");
            }
        }
        out.push_str("  a b c d e f g h i\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_has_thirty_two_pieces() {
        let g = Grid::standard_opening();
        assert_eq!(g.occupied(), 32);
        assert_eq!(g.king_count(Side::Red), 1);
        assert_eq!(g.king_count(Side::Black), 1);
        assert_eq!(g.get(0, 4), Some(PieceSymbol::new(Side::Black, PieceKind::King)));
        assert_eq!(g.get(9, 4), Some(PieceSymbol::new(Side::Red, PieceKind::King)));
        assert_eq!(g.get(7, 1), Some(PieceSymbol::new(Side::Red, PieceKind::Cannon)));
        assert_eq!(g.get(3, 8), Some(PieceSymbol::new(Side::Black, PieceKind::Pawn)));
        assert_eq!(g.get(1, 4), None);
        assert_eq!(g.get(8, 0), None);
    }

    #[test]
    fn render_marks_empty_points_and_river() {
        let mut g = Grid::empty();
        g.set(0, 4, Some(PieceSymbol::new(Side::Black, PieceKind::King)));
        let text = g.render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "9 · · · · 将 · · · ·");
        assert!(lines[5].contains('~'));
        assert_eq!(lines[11], "  a b c d e f g h i");
    }
}
