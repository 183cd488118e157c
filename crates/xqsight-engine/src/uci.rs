//! Parsing of the engine lines we care about.

use crate::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use xqsight_position::Move;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// From the side to move.
    Centipawns(i32),
    /// Moves to mate; negative when the side to move is mated.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{cp:+} cp"),
            Self::Mate(n) => write!(f, "mate {n}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "move", rename_all = "snake_case")]
pub enum BestMove {
    Move(Move),
    /// `bestmove (none)`: the side to move has no legal move.
    NoMove,
}

impl fmt::Display for BestMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(m) => write!(f, "{m}"),
            Self::NoMove => f.write_str("no move"),
        }
    }
}

/// Progress carried by an `info` line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub score: Option<Score>,
}

pub fn parse_info(line: &str) -> Option<InfoLine> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "info" {
        return None;
    }
    let mut info = InfoLine::default();
    while let Some(tok) = tokens.next() {
        match tok {
            "depth" => info.depth = tokens.next().and_then(|t| t.parse().ok()),
            "score" => {
                let kind = tokens.next();
                let value = tokens.next().and_then(|t| t.parse().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => info.score,
                };
            }
            // the rest of the line is the variation
            "pv" => break,
            _ => {}
        }
    }
    Some(info)
}

/// `bestmove h2e2 [ponder h9g7]`. Returns `None` for non-bestmove lines.
pub fn parse_bestmove(line: &str) -> Option<Result<BestMove, AnalysisError>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "bestmove" {
        return None;
    }
    Some(match tokens.next() {
        None | Some("(none)") | Some("none") | Some("0000") => Ok(BestMove::NoMove),
        Some(mv) => mv
            .parse()
            .map(BestMove::Move)
            .map_err(|_| AnalysisError::Protocol(line.to_owned())),
    })
}
