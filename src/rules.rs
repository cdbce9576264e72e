//! Move generation and the special rules layered on top of it.
//!
//! Everything here is a pure function of a [`Board`]: nothing in this module
//! mutates the live board.

use crate::board::{Board, COLS, PieceView, Position, ROWS};
use crate::piece::{Piece, PieceKind, Player};

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ALL_DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// What a piece may do with river cells along its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverPolicy {
    /// Any river cell may be crossed or occupied.
    Free,
    /// River cells must be bridges.
    BridgesOnly,
    /// No river cell at all, bridges included.
    Forbidden,
}

impl RiverPolicy {
    fn permits(&self, board: &Board, pos: Position) -> bool {
        match self {
            RiverPolicy::Free => true,
            RiverPolicy::BridgesOnly => !board.is_open_water(pos),
            RiverPolicy::Forbidden => !board.is_river(pos),
        }
    }
}

/// Cells visited by a straight or diagonal walk of `steps` from `from`,
/// destination last. `None` if the walk leaves the board.
pub fn traverse(from: Position, (dr, dc): (i32, i32), steps: usize) -> Option<Vec<Position>> {
    (1..=steps as i32)
        .map(|i| from.offset(dr * i, dc * i))
        .collect()
}

/// Whether every traversed cell satisfies `policy`.
pub fn path_respects_river(board: &Board, path: &[Position], policy: RiverPolicy) -> bool {
    path.iter().all(|&pos| policy.permits(board, pos))
}

/// The shared destination filter: not our own piece, and anything standing
/// there must be capturable by `piece`.
fn can_land(board: &Board, piece: Piece, to: Position) -> bool {
    match board.get_piece(to) {
        None => true,
        Some(target) if target.owner == piece.owner => false,
        Some(target) => piece.kind.can_capture(target.kind),
    }
}

/// Walk every direction for every step count, keeping destinations whose
/// path is unobstructed and whose river crossing `policy` allows.
fn generate(
    board: &Board,
    piece: Piece,
    from: Position,
    directions: &[(i32, i32)],
    steps: &[usize],
    policy: impl Fn((i32, i32)) -> RiverPolicy,
) -> Vec<Position> {
    let mut moves = Vec::new();

    for &step in steps {
        for &dir in directions {
            let Some(path) = traverse(from, dir, step) else {
                continue;
            };
            let (&to, between) = match path.split_last() {
                Some(split) => split,
                None => continue,
            };

            // No jumping, and no capturing on the way through
            if between.iter().any(|&pos| board.get_piece(pos).is_some()) {
                continue;
            }
            if !path_respects_river(board, &path, policy(dir)) {
                continue;
            }
            if can_land(board, piece, to) {
                moves.push(to);
            }
        }
    }

    moves
}

/// Legal destinations for `piece` standing on `from`.
///
/// Computed fresh from the board each time. The facing rule is applied only
/// to anchor moves here; moves by other pieces that open a lane between the
/// anchors are caught when the move is committed.
pub fn legal_moves(board: &Board, piece: Piece, from: Position) -> Vec<Position> {
    match piece.kind {
        PieceKind::Anchor => {
            generate(board, piece, from, &ALL_DIRECTIONS, &[1], |_| RiverPolicy::Free)
                .into_iter()
                .filter(|&to| board.is_fortress(piece.owner, to))
                .filter(|&to| !opens_facing(board, from, to))
                .collect()
        }
        PieceKind::Heavy => generate(board, piece, from, &ALL_DIRECTIONS, &[1, 2], |_| {
            RiverPolicy::BridgesOnly
        }),
        PieceKind::Strong => {
            generate(board, piece, from, &DIAGONAL, &[1, 2], |_| RiverPolicy::Forbidden)
        }
        PieceKind::Light => {
            generate(board, piece, from, &ORTHOGONAL, &[1], |_| RiverPolicy::BridgesOnly)
        }
        PieceKind::Swimmer => {
            generate(board, piece, from, &ORTHOGONAL, &[2], |_| RiverPolicy::Free)
        }
        PieceKind::Amphibious => {
            generate(board, piece, from, &ALL_DIRECTIONS, &[2], |(dr, dc)| {
                if dr != 0 && dc != 0 {
                    RiverPolicy::BridgesOnly
                } else {
                    RiverPolicy::Free
                }
            })
        }
        PieceKind::Scout => {
            // Forward is along the columns; sideways is along the rows
            let directions = [(0, piece.owner.forward()), (1, 0), (-1, 0)];
            generate(board, piece, from, &directions, &[1], |_| {
                RiverPolicy::BridgesOnly
            })
        }
    }
}

/// Legal destinations of whatever stands on `from`; empty for an empty cell.
pub fn legal_moves_at(board: &Board, from: Position) -> Vec<Position> {
    match board.get_piece(from) {
        Some(piece) => legal_moves(board, piece, from),
        None => Vec::new(),
    }
}

/// The board as it would look after moving `from` to `to`, without
/// touching the board itself.
#[derive(Debug, Clone, Copy)]
pub struct Hypothetical<'a> {
    board: &'a Board,
    from: Position,
    to: Position,
}

impl<'a> Hypothetical<'a> {
    pub fn new(board: &'a Board, from: Position, to: Position) -> Self {
        Hypothetical { board, from, to }
    }
}

impl PieceView for Hypothetical<'_> {
    fn piece_at(&self, pos: Position) -> Option<Piece> {
        if pos == self.to {
            self.board.get_piece(self.from)
        } else if pos == self.from {
            None
        } else {
            self.board.get_piece(pos)
        }
    }
}

/// Both anchors on one row with nothing between them.
pub fn anchors_facing(view: &impl PieceView) -> bool {
    let (Some(west), Some(east)) = (
        view.find(PieceKind::Anchor, Player::West),
        view.find(PieceKind::Anchor, Player::East),
    ) else {
        return false;
    };
    if west.row != east.row {
        return false;
    }

    let row = west.row;
    let (lo, hi) = (west.col.min(east.col), west.col.max(east.col));
    ((lo + 1)..hi).all(|col| view.piece_at(Position::new(row, col)).is_none())
}

/// Whether moving `from` to `to` would leave the anchors facing.
pub fn opens_facing(board: &Board, from: Position, to: Position) -> bool {
    anchors_facing(&Hypothetical::new(board, from, to))
}

/// The column on which `owner`'s scouts promote.
pub fn promotion_column(owner: Player) -> usize {
    match owner {
        Player::West => COLS - 1,
        Player::East => 0,
    }
}

/// Column-based: a sideways step along the far column also promotes.
pub fn promotes(piece: Piece, to: Position) -> bool {
    piece.kind == PieceKind::Scout && to.col == promotion_column(piece.owner)
}

/// All cells holding a piece of `owner`.
pub fn pieces_of(board: &Board, owner: Player) -> Vec<Position> {
    (0..ROWS)
        .flat_map(|row| (0..COLS).map(move |col| Position::new(row, col)))
        .filter(|&pos| board.get_piece(pos).is_some_and(|p| p.owner == owner))
        .collect()
}
