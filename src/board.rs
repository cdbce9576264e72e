use serde::{Deserialize, Serialize};
use std::fmt;

use crate::piece::{Piece, PieceKind, Player};

/// Board dimensions
pub const ROWS: usize = 7;
pub const COLS: usize = 9;

/// The river runs down the middle column.
pub const RIVER_COL: usize = 4;
pub const BRIDGE_ROWS: [usize; 3] = [0, 3, 6];

/// Rows spanned by both fortress zones.
pub const FORTRESS_ROWS: std::ops::RangeInclusive<usize> = 1..=5;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    pub fn in_bounds(&self) -> bool {
        self.row < ROWS && self.col < COLS
    }

    /// The position `(dr, dc)` away, if it is on the board.
    pub fn offset(&self, dr: i32, dc: i32) -> Option<Position> {
        let r = self.row as i32 + dr;
        let c = self.col as i32 + dc;
        if r < 0 || r >= ROWS as i32 || c < 0 || c >= COLS as i32 {
            return None;
        }
        Some(Position::new(r as usize, c as usize))
    }
}

impl fmt::Display for Position {
    /// Column letter and 1-based row, e.g. `A4`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = (b'A' + self.col as u8) as char;
        write!(f, "{}{}", letter, self.row + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Normal,
    River,
    Bridge,
    Fortress(Player),
    FortressCenter,
}

impl CellKind {
    /// Static classification of a cell. Only used at board construction.
    fn classify(row: usize, col: usize) -> CellKind {
        if col == RIVER_COL {
            return if BRIDGE_ROWS.contains(&row) {
                CellKind::Bridge
            } else {
                CellKind::River
            };
        }
        if row == 3 && (col == 0 || col == COLS - 1) {
            return CellKind::FortressCenter;
        }
        if (2..=4).contains(&row) {
            if col <= 2 {
                return CellKind::Fortress(Player::West);
            }
            if col >= COLS - 3 {
                return CellKind::Fortress(Player::East);
            }
        }
        CellKind::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub piece: Option<Piece>,
}

/// Anything that can answer "what stands on this square".
///
/// Implemented by [`Board`] and by hypothetical views over it, so rule
/// predicates can be evaluated without mutating the live board.
pub trait PieceView {
    fn piece_at(&self, pos: Position) -> Option<Piece>;

    fn find(&self, kind: PieceKind, owner: Player) -> Option<Position> {
        (0..ROWS)
            .flat_map(|row| (0..COLS).map(move |col| Position::new(row, col)))
            .find(|&pos| self.piece_at(pos) == Some(Piece::new(kind, owner)))
    }

    fn count_pieces(&self, owner: Player) -> usize {
        (0..ROWS)
            .flat_map(|row| (0..COLS).map(move |col| Position::new(row, col)))
            .filter(|&pos| self.piece_at(pos).is_some_and(|p| p.owner == owner))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    /// Board topology with no pieces on it.
    pub fn empty() -> Self {
        let mut cells = [[Cell {
            kind: CellKind::Normal,
            piece: None,
        }; COLS]; ROWS];

        for (row, line) in cells.iter_mut().enumerate() {
            for (col, cell) in line.iter_mut().enumerate() {
                cell.kind = CellKind::classify(row, col);
            }
        }

        Board { cells }
    }

    /// Board in the canonical starting layout.
    pub fn new() -> Self {
        let mut board = Board::empty();
        board.setup();
        board
    }

    /// Place both armies. East mirrors West across the river.
    fn setup(&mut self) {
        let layout: [(PieceKind, &[(usize, usize)]); 7] = [
            (PieceKind::Heavy, &[(0, 0), (6, 0)]),
            (PieceKind::Strong, &[(2, 0), (5, 0)]),
            (PieceKind::Light, &[(1, 0), (4, 0)]),
            (PieceKind::Swimmer, &[(1, 1), (5, 1)]),
            (PieceKind::Amphibious, &[(4, 1)]),
            (PieceKind::Scout, &[(0, 1), (2, 1), (3, 1), (6, 1)]),
            (PieceKind::Anchor, &[(3, 0)]),
        ];

        for (kind, squares) in layout {
            for &(r, c) in squares {
                self.place_piece(Position::new(r, c), Piece::new(kind, Player::West));
                self.place_piece(
                    Position::new(r, COLS - 1 - c),
                    Piece::new(kind, Player::East),
                );
            }
        }
    }

    /// # Panics
    ///
    /// Panics if `pos` is off the board; callers check [`Position::in_bounds`].
    pub fn cell_at(&self, pos: Position) -> &Cell {
        &self.cells[pos.row][pos.col]
    }

    pub fn get_piece(&self, pos: Position) -> Option<Piece> {
        if pos.in_bounds() {
            self.cells[pos.row][pos.col].piece
        } else {
            None
        }
    }

    /// True for every river-column cell, bridges included.
    pub fn is_river(&self, pos: Position) -> bool {
        matches!(
            self.cell_at(pos).kind,
            CellKind::River | CellKind::Bridge
        )
    }

    pub fn is_bridge(&self, pos: Position) -> bool {
        self.cell_at(pos).kind == CellKind::Bridge
    }

    /// River cell that is not a bridge.
    pub fn is_open_water(&self, pos: Position) -> bool {
        self.cell_at(pos).kind == CellKind::River
    }

    /// Whether `pos` lies in the zone `owner`'s anchor is confined to.
    ///
    /// This is a fixed rectangle, wider than the cells annotated as fortress.
    pub fn is_fortress(&self, owner: Player, pos: Position) -> bool {
        if !pos.in_bounds() || !FORTRESS_ROWS.contains(&pos.row) {
            return false;
        }
        match owner {
            Player::West => pos.col <= 2,
            Player::East => pos.col >= COLS - 3,
        }
    }

    pub fn place_piece(&mut self, pos: Position, piece: Piece) {
        self.cells[pos.row][pos.col].piece = Some(piece);
    }

    pub fn remove_piece(&mut self, pos: Position) -> Option<Piece> {
        self.cells[pos.row][pos.col].piece.take()
    }

    /// Move whatever stands on `from` to `to`, returning what was on `to`.
    /// No legality checks.
    pub fn move_piece(&mut self, from: Position, to: Position) -> Option<Piece> {
        let moving = self.remove_piece(from);
        let captured = self.cells[to.row][to.col].piece.take();
        self.cells[to.row][to.col].piece = moving;
        captured
    }

    pub fn set_kind(&mut self, pos: Position, kind: PieceKind) {
        if let Some(piece) = self.cells[pos.row][pos.col].piece.as_mut() {
            piece.kind = kind;
        }
    }

    pub fn clear(&mut self) {
        for line in self.cells.iter_mut() {
            for cell in line.iter_mut() {
                cell.piece = None;
            }
        }
    }

    /// Get a string representation of the board
    pub fn display(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for col in 0..COLS {
            result.push_str(&format!(" {} ", (b'A' + col as u8) as char));
        }
        result.push('\n');

        for row in 0..ROWS {
            result.push_str(&format!("{:2} ", row + 1));
            for col in 0..COLS {
                let cell = &self.cells[row][col];
                let c = match (cell.piece, cell.kind) {
                    (Some(piece), _) => piece.glyph(),
                    (None, CellKind::Bridge) => '=',
                    (None, CellKind::River) => '~',
                    (None, CellKind::FortressCenter) => '+',
                    (None, CellKind::Fortress(_)) => ':',
                    (None, CellKind::Normal) => '.',
                };
                result.push_str(&format!(" {} ", c));
            }
            result.push('\n');
        }

        result
    }
}

impl PieceView for Board {
    fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.get_piece(pos)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_river_and_bridges() {
        let board = Board::empty();

        for row in 0..ROWS {
            let pos = Position::new(row, RIVER_COL);
            assert!(board.is_river(pos));
            assert_eq!(board.is_bridge(pos), [0, 3, 6].contains(&row));
        }

        assert!(!board.is_river(Position::new(3, 3)));
        assert!(!board.is_river(Position::new(3, 5)));
        assert!(board.is_open_water(Position::new(1, RIVER_COL)));
        assert!(!board.is_open_water(Position::new(0, RIVER_COL)));
    }

    #[test]
    fn test_fortress_annotation() {
        let board = Board::empty();

        assert_eq!(
            board.cell_at(Position::new(3, 0)).kind,
            CellKind::FortressCenter
        );
        assert_eq!(
            board.cell_at(Position::new(3, 8)).kind,
            CellKind::FortressCenter
        );
        assert_eq!(
            board.cell_at(Position::new(2, 2)).kind,
            CellKind::Fortress(Player::West)
        );
        assert_eq!(
            board.cell_at(Position::new(4, 6)).kind,
            CellKind::Fortress(Player::East)
        );
        // Rows 1 and 5 are not annotated even though the anchor may use them
        assert_eq!(board.cell_at(Position::new(1, 1)).kind, CellKind::Normal);
        assert_eq!(board.cell_at(Position::new(3, 3)).kind, CellKind::Normal);
    }

    #[test]
    fn test_fortress_zone_is_wider_than_annotation() {
        let board = Board::empty();

        assert!(board.is_fortress(Player::West, Position::new(1, 0)));
        assert!(board.is_fortress(Player::West, Position::new(5, 2)));
        assert!(!board.is_fortress(Player::West, Position::new(0, 0)));
        assert!(!board.is_fortress(Player::West, Position::new(3, 3)));
        assert!(!board.is_fortress(Player::West, Position::new(3, 8)));

        assert!(board.is_fortress(Player::East, Position::new(1, 6)));
        assert!(board.is_fortress(Player::East, Position::new(5, 8)));
        assert!(!board.is_fortress(Player::East, Position::new(6, 8)));
    }

    #[test]
    fn test_initial_setup_is_mirrored() {
        let board = Board::new();

        assert_eq!(
            board.get_piece(Position::new(3, 0)),
            Some(Piece::new(PieceKind::Anchor, Player::West))
        );
        assert_eq!(
            board.get_piece(Position::new(3, 8)),
            Some(Piece::new(PieceKind::Anchor, Player::East))
        );

        for row in 0..ROWS {
            for col in 0..COLS {
                let west = board.get_piece(Position::new(row, col));
                let east = board.get_piece(Position::new(row, COLS - 1 - col));
                assert_eq!(west.map(|p| p.kind), east.map(|p| p.kind));
            }
        }

        assert_eq!(board.count_pieces(Player::West), 14);
        assert_eq!(board.count_pieces(Player::East), 14);
        // Nothing starts in the middle three columns
        for row in 0..ROWS {
            for col in 2..7 {
                assert_eq!(board.get_piece(Position::new(row, col)), None);
            }
        }
    }

    #[test]
    fn test_one_anchor_per_side() {
        let board = Board::new();
        let anchors = (0..ROWS)
            .flat_map(|r| (0..COLS).map(move |c| Position::new(r, c)))
            .filter(|&p| board.get_piece(p).map(|x| x.kind) == Some(PieceKind::Anchor))
            .count();
        assert_eq!(anchors, 2);
        assert_eq!(
            board.find(PieceKind::Anchor, Player::West),
            Some(Position::new(3, 0))
        );
    }

    #[test]
    fn test_move_piece_returns_captured() {
        let mut board = Board::empty();
        let west = Piece::new(PieceKind::Light, Player::West);
        let east = Piece::new(PieceKind::Scout, Player::East);
        board.place_piece(Position::new(2, 2), west);
        board.place_piece(Position::new(2, 3), east);

        let captured = board.move_piece(Position::new(2, 2), Position::new(2, 3));

        assert_eq!(captured, Some(east));
        assert_eq!(board.get_piece(Position::new(2, 2)), None);
        assert_eq!(board.get_piece(Position::new(2, 3)), Some(west));
    }

    #[test]
    fn test_offset_bounds() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(0, -1), None);
        assert_eq!(corner.offset(1, 1), Some(Position::new(1, 1)));
        assert_eq!(Position::new(6, 8).offset(1, 0), None);
        assert!(!Position::new(7, 0).in_bounds());
    }

    #[test]
    fn test_position_label() {
        assert_eq!(Position::new(0, 0).to_string(), "A1");
        assert_eq!(Position::new(6, 8).to_string(), "I7");
    }

    #[test]
    fn test_display_marks_river() {
        let text = Board::new().display();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), ROWS + 1);
        assert!(rows[1].contains('='));
        assert!(rows[2].contains('~'));
    }
}
