use serde::{Deserialize, Serialize};
use std::fmt;

use crate::challenge::normalize_answer;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// Starts on the left, advances towards the last column.
    West,
    /// Starts on the right, advances towards column 0.
    East,
}

impl Player {
    pub fn opponent(&self) -> Player {
        match self {
            Player::West => Player::East,
            Player::East => Player::West,
        }
    }

    /// Column delta of a forward step.
    pub fn forward(&self) -> i32 {
        match self {
            Player::West => 1,
            Player::East => -1,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Player::West => "West",
            Player::East => "East",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    /// Losing it loses the game. Confined to its fortress.
    Anchor,
    Heavy,
    Strong,
    Light,
    Swimmer,
    Amphibious,
    /// The only promotable kind.
    Scout,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::Anchor,
        PieceKind::Heavy,
        PieceKind::Strong,
        PieceKind::Light,
        PieceKind::Swimmer,
        PieceKind::Amphibious,
        PieceKind::Scout,
    ];

    /// Whether `self` may take a piece of kind `target`.
    ///
    /// The table is not symmetric: a scout takes a heavy piece but a heavy
    /// piece cannot take a scout.
    pub fn can_capture(&self, target: PieceKind) -> bool {
        use PieceKind::*;
        match self {
            Anchor => !matches!(target, Anchor),
            Heavy => !matches!(target, Scout),
            Strong => !matches!(target, Heavy),
            Light => matches!(target, Anchor | Light | Swimmer | Amphibious | Scout),
            Swimmer => matches!(target, Anchor | Light | Swimmer | Scout),
            Amphibious => matches!(target, Anchor | Light | Swimmer | Amphibious | Scout),
            Scout => matches!(target, Anchor | Heavy | Scout),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            PieceKind::Anchor => 'A',
            PieceKind::Heavy => 'H',
            PieceKind::Strong => 'S',
            PieceKind::Light => 'L',
            PieceKind::Swimmer => 'W',
            PieceKind::Amphibious => 'M',
            PieceKind::Scout => 'C',
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PieceKind::Anchor => "anchor",
            PieceKind::Heavy => "heavy",
            PieceKind::Strong => "strong",
            PieceKind::Light => "light",
            PieceKind::Swimmer => "swimmer",
            PieceKind::Amphibious => "amphibious",
            PieceKind::Scout => "scout",
        }
    }

    /// Short rules blurb shown next to a selected piece.
    pub fn describe(&self) -> &str {
        match self {
            PieceKind::Anchor => {
                "1 step in 8 directions inside its own fortress; may never face the other anchor"
            }
            PieceKind::Heavy => {
                "1-2 steps straight or diagonal, not through pieces; crosses the river by bridge"
            }
            PieceKind::Strong => "1-2 diagonal steps, not through pieces; never touches the river",
            PieceKind::Light => "1 orthogonal step; crosses the river by bridge",
            PieceKind::Swimmer => "exactly 2 orthogonal steps, not through pieces; swims the river",
            PieceKind::Amphibious => {
                "exactly 2 steps in 8 directions; swims straight, never diagonally across water"
            }
            PieceKind::Scout => {
                "1 step forward or sideways, never back; crosses by bridge; promotes on the far column"
            }
        }
    }

    /// Parses a promotion choice. Returns `None` for anything that is not a
    /// valid promotion target; the anchor is never one.
    pub fn parse_promotion(input: &str) -> Option<PieceKind> {
        let key = normalize_answer(input);
        let kind = match key.as_str() {
            "heavy" | "h" | "voi" => PieceKind::Heavy,
            "strong" | "s" | "ho" => PieceKind::Strong,
            "light" | "l" | "meo" => PieceKind::Light,
            "swimmer" | "w" | "ran" => PieceKind::Swimmer,
            "amphibious" | "m" | "cho" => PieceKind::Amphibious,
            "scout" | "c" | "chuot" => PieceKind::Scout,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub owner: Player,
}

impl Piece {
    pub fn new(kind: PieceKind, owner: Player) -> Self {
        Piece { kind, owner }
    }

    /// Board glyph: upper case for West, lower case for East.
    pub fn glyph(&self) -> char {
        match self.owner {
            Player::West => self.kind.symbol(),
            Player::East => self.kind.symbol().to_ascii_lowercase(),
        }
    }
}
