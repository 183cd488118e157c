use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Red,
    Black,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Black,
            Self::Black => Self::Red,
        }
    }

    /// Side-to-move token used in position records.
    pub fn token(self) -> char {
        match self {
            Self::Red => 'w',
            Self::Black => 'b',
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "w" | "r" => Some(Self::Red),
            "b" => Some(Self::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Black => "black",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    King,
    Advisor,
    Bishop,
    Knight,
    Rook,
    Cannon,
    Pawn,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        Self::King,
        Self::Advisor,
        Self::Bishop,
        Self::Knight,
        Self::Rook,
        Self::Cannon,
        Self::Pawn,
    ];

    fn letter(self) -> char {
        match self {
            Self::King => 'k',
            Self::Advisor => 'a',
            Self::Bishop => 'b',
            Self::Knight => 'n',
            Self::Rook => 'r',
            Self::Cannon => 'c',
            Self::Pawn => 'p',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'k' => Self::King,
            'a' => Self::Advisor,
            'b' => Self::Bishop,
            'n' => Self::Knight,
            'r' => Self::Rook,
            'c' => Self::Cannon,
            'p' => Self::Pawn,
            _ => return None,
        })
    }

    /// Pieces that move along files and ranks and count their steps in
    /// traditional notation.
    pub fn moves_straight(self) -> bool {
        matches!(self, Self::King | Self::Rook | Self::Cannon | Self::Pawn)
    }
}

/// A side plus a piece kind, `K` for the red king, `k` for the black one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceSymbol {
    pub side: Side,
    pub kind: PieceKind,
}

impl PieceSymbol {
    pub const fn new(side: Side, kind: PieceKind) -> Self {
        Self { side, kind }
    }

    pub fn to_char(self) -> char {
        let c = self.kind.letter();
        match self.side {
            Side::Red => c.to_ascii_uppercase(),
            Side::Black => c,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_letter(c.to_ascii_lowercase())?;
        let side = if c.is_ascii_uppercase() {
            Side::Red
        } else {
            Side::Black
        };
        Some(Self { side, kind })
    }

    /// Board glyph; red and black use different characters for every kind.
    pub fn glyph(self) -> char {
        match (self.side, self.kind) {
            (Side::Red, PieceKind::King) => '帅',
            (Side::Red, PieceKind::Advisor) => '仕',
            (Side::Red, PieceKind::Bishop) => '相',
            (Side::Red, PieceKind::Knight) => '马',
            (Side::Red, PieceKind::Rook) => '车',
            (Side::Red, PieceKind::Cannon) => '炮',
            (Side::Red, PieceKind::Pawn) => '兵',
            (Side::Black, PieceKind::King) => '将',
            (Side::Black, PieceKind::Advisor) => '士',
            (Side::Black, PieceKind::Bishop) => '象',
            (Side::Black, PieceKind::Knight) => '馬',
            (Side::Black, PieceKind::Rook) => '車',
            (Side::Black, PieceKind::Cannon) => '砲',
            (Side::Black, PieceKind::Pawn) => '卒',
        }
    }

    /// Name used in move notation (simplified forms for both sides).
    pub fn notation_name(self) -> char {
        match (self.side, self.kind) {
            (_, PieceKind::Knight) => '马',
            (_, PieceKind::Rook) => '车',
            (_, PieceKind::Cannon) => '炮',
            _ => self.glyph(),
        }
    }
}

impl fmt::Display for PieceSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
