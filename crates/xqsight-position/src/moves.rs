//! Engine move coordinates (`h2e2`) and their traditional description
//! (`炮二平五`).

use crate::grid::{FILES, RANKS};
use crate::{Grid, PositionError, Side};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RED_NUMERALS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// A board point. `row` 0 is black's back rank; rank digits count from red's
/// side, so rank `0` is row 9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub col: usize,
}

impl Square {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    fn parse(file: char, rank: char) -> Option<Self> {
        let col = (file as u32).checked_sub('a' as u32)? as usize;
        let rank = rank.to_digit(10)? as usize;
        (col < FILES && rank < RANKS).then(|| Self::new(RANKS - 1 - rank, col))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = char::from(b'a' + self.col as u8);
        write!(f, "{file}{}", RANKS - 1 - self.row)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    /// `a3 -> a4`
    pub fn coordinate_text(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PositionError::BadMove(s.to_owned());
        let c: Vec<char> = s.trim().chars().collect();
        if c.len() != 4 {
            return Err(bad());
        }
        let from = Square::parse(c[0], c[1]).ok_or_else(bad)?;
        let to = Square::parse(c[2], c[3]).ok_or_else(bad)?;
        if from == to {
            return Err(bad());
        }
        Ok(Self { from, to })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// File number from the mover's own side, counted right to left.
fn file_number(side: Side, col: usize) -> usize {
    match side {
        Side::Red => FILES - col,
        Side::Black => col + 1,
    }
}

fn numeral(side: Side, n: usize) -> char {
    match side {
        Side::Red => RED_NUMERALS[(n.clamp(1, 9)) - 1],
        Side::Black => char::from_digit(n as u32, 10).unwrap_or('?'),
    }
}

/// Traditional four-character description of `mv` on `grid`, e.g. `马八进七`.
///
/// Two identical pieces on one file are told apart with `前`/`后`.
pub fn describe_move(mv: &Move, grid: &Grid) -> Result<String, PositionError> {
    let (from, to) = (mv.from, mv.to);
    let piece = grid
        .get(from.row, from.col)
        .ok_or_else(|| PositionError::EmptySource(from.to_string()))?;
    let side = piece.side;

    let mut out = String::new();

    let mut tandem: Vec<usize> = grid
        .pieces()
        .filter(|&((_, c), p)| p == piece && c == from.col)
        .map(|((r, _), _)| r)
        .collect();
    if tandem.len() == 2 {
        // front is the one further towards the opponent
        tandem.sort_unstable();
        let front = match side {
            Side::Red => tandem[0],
            Side::Black => tandem[1],
        };
        out.push(if from.row == front { '前' } else { '后' });
        out.push(piece.notation_name());
    } else {
        out.push(piece.notation_name());
        out.push(numeral(side, file_number(side, from.col)));
    }

    if from.row == to.row {
        out.push('平');
        out.push(numeral(side, file_number(side, to.col)));
        return Ok(out);
    }

    let forward = match side {
        Side::Red => to.row < from.row,
        Side::Black => to.row > from.row,
    };
    out.push(if forward { '进' } else { '退' });
    if piece.kind.moves_straight() {
        out.push(numeral(side, from.row.abs_diff(to.row)));
    } else {
        out.push(numeral(side, file_number(side, to.col)));
    }
    Ok(out)
}
