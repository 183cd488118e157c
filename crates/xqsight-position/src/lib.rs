//! Xiangqi positions: pieces, the 9x10 occupancy grid, FEN-style position
//! records and move notation.
//!
//! ```
//! use xqsight_position::{encode_position, Grid, Side};
//!
//! let record = encode_position(&Grid::standard_opening(), Side::Red).unwrap();
//! assert_eq!(
//!     record.as_str(),
//!     "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1"
//! );
//! assert_eq!(record.decode().unwrap(), Grid::standard_opening());
//! ```

mod grid;
mod moves;
mod piece;
mod record;

pub use grid::{opening_kind, Grid, FILES, RANKS};
pub use moves::{describe_move, Move, Square};
pub use piece::{PieceKind, PieceSymbol, Side};
pub use record::{encode_position, PositionError, PositionRecord, OPENING_RECORD};
