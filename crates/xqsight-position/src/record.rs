//! FEN-style position records.
//!
//! A record is ten `/`-separated ranks (row 0 first), each a run-length
//! encoding of nine points, followed by the side to move, two placeholder
//! fields and the half-move / full-move counters:
//!
//! ```text
//! rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1
//! ```

use crate::grid::{FILES, RANKS};
use crate::{Grid, PieceSymbol, Side};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("expected 10 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {rank} covers {width} points, expected 9")]
    RankWidth { rank: usize, width: usize },
    #[error("unknown piece symbol '{0}'")]
    UnknownSymbol(char),
    #[error("{side} has {count} kings, expected exactly 1")]
    KingCount { side: Side, count: usize },
    #[error("invalid side-to-move token '{0}'")]
    BadSide(String),
    #[error("invalid move counter '{0}'")]
    BadCounter(String),
    #[error("rank {0} splits a run of empty points")]
    SplitRun(usize),
    #[error("empty position record")]
    Empty,
    #[error("invalid move '{0}'")]
    BadMove(String),
    #[error("no piece on {0}")]
    EmptySource(String),
}

/// A structurally well-formed position record.
///
/// Structure (rank count, rank widths, symbols, side token) is checked on
/// construction; king counts are checked by [`PositionRecord::validate`] so
/// that an implausible but well-formed record can still be reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PositionRecord {
    text: String,
}

/// Record of the standard opening with red to move.
pub const OPENING_RECORD: &str =
    "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1";

fn encode_rank(row: &[Option<PieceSymbol>; FILES], out: &mut String) {
    let mut run = 0u8;
    for cell in row {
        match cell {
            None => run += 1,
            Some(p) => {
                if run > 0 {
                    out.push(char::from(b'0' + run));
                    run = 0;
                }
                out.push(p.to_char());
            }
        }
    }
    if run > 0 {
        out.push(char::from(b'0' + run));
    }
}

fn decode_placement(placement: &str) -> Result<Grid, PositionError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != RANKS {
        return Err(PositionError::RankCount(ranks.len()));
    }
    let mut grid = Grid::empty();
    for (row, rank) in ranks.iter().enumerate() {
        let mut col = 0usize;
        let mut after_run = false;
        for ch in rank.chars() {
            if let Some(d) = ch.to_digit(10) {
                if d == 0 {
                    return Err(PositionError::UnknownSymbol(ch));
                }
                // canonical records write one digit per run
                if after_run {
                    return Err(PositionError::SplitRun(row));
                }
                after_run = true;
                col += d as usize;
            } else {
                after_run = false;
                let piece = PieceSymbol::from_char(ch).ok_or(PositionError::UnknownSymbol(ch))?;
                if col < FILES {
                    grid.set(row, col, Some(piece));
                }
                col += 1;
            }
        }
        if col != FILES {
            return Err(PositionError::RankWidth {
                rank: row,
                width: col,
            });
        }
    }
    Ok(grid)
}

impl PositionRecord {
    /// Encode a grid. Never fails; see [`PositionRecord::validate`].
    pub fn encode(grid: &Grid, side: Side) -> Self {
        let mut text = String::with_capacity(96);
        for (r, row) in grid.rows().iter().enumerate() {
            if r > 0 {
                text.push('/');
            }
            encode_rank(row, &mut text);
        }
        text.push(' ');
        text.push(side.token());
        text.push_str(" - - 0 1");
        Self { text }
    }

    pub fn opening() -> Self {
        Self {
            text: OPENING_RECORD.to_owned(),
        }
    }

    /// Parse a record. Missing trailing fields are filled with `w - - 0 1`
    /// defaults; a bare placement is accepted.
    pub fn parse(text: &str) -> Result<Self, PositionError> {
        let mut fields = text.split_whitespace();
        let placement = fields.next().ok_or(PositionError::Empty)?;
        decode_placement(placement)?;

        let side = match fields.next() {
            Some(tok) => Side::from_token(tok).ok_or_else(|| PositionError::BadSide(tok.to_owned()))?,
            None => Side::Red,
        };
        let castle = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let mut counter = |default: &str| -> Result<String, PositionError> {
            let tok = fields.next().unwrap_or(default);
            tok.parse::<u32>()
                .map(|_| tok.to_owned())
                .map_err(|_| PositionError::BadCounter(tok.to_owned()))
        };
        let half = counter("0")?;
        let full = counter("1")?;

        Ok(Self {
            text: format!("{placement} {} {castle} {ep} {half} {full}", side.token()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn placement(&self) -> &str {
        self.text.split(' ').next().unwrap_or("")
    }

    pub fn side_to_move(&self) -> Side {
        self.text
            .split(' ')
            .nth(1)
            .and_then(Side::from_token)
            .unwrap_or(Side::Red)
    }

    /// Same placement, different side to move.
    pub fn with_side(&self, side: Side) -> Self {
        let mut parts: Vec<&str> = self.text.split(' ').collect();
        let tok = side.token().to_string();
        if parts.len() > 1 {
            parts[1] = &tok;
        }
        Self {
            text: parts.join(" "),
        }
    }

    pub fn decode(&self) -> Result<Grid, PositionError> {
        decode_placement(self.placement())
    }

    /// Full validation: structure plus exactly one king per side.
    pub fn validate(&self) -> Result<Grid, PositionError> {
        let grid = self.decode()?;
        for side in [Side::Red, Side::Black] {
            let count = grid.king_count(side);
            if count != 1 {
                return Err(PositionError::KingCount { side, count });
            }
        }
        Ok(grid)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Encode and validate in one step.
pub fn encode_position(grid: &Grid, side: Side) -> Result<PositionRecord, PositionError> {
    let record = PositionRecord::encode(grid, side);
    record.validate()?;
    Ok(record)
}

impl fmt::Display for PositionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for PositionRecord {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PositionRecord {
    type Error = PositionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PositionRecord> for String {
    fn from(r: PositionRecord) -> Self {
        r.text
    }
}
