use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::board::{Board, CellKind, PieceView, Position};
use crate::challenge::{ChallengeBank, order_index_of};
use crate::config::{DRAW_THRESHOLD, GateMode};
use crate::gate::{Gate, GateDecision, Prompter, Resolution};
use crate::piece::{Piece, PieceKind, Player};
use crate::rules;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Game already over")]
    GameOver,
    #[error("Cell ({row}, {col}) is not on the board")]
    OutOfBounds { row: usize, col: usize },
    #[error("The selected piece cannot move to {0}")]
    IllegalDestination(Position),
    #[error("Anchors may not face each other along an open row")]
    FacingViolation,
    #[error("Answer the question before moving")]
    PermissionRequired,
    #[error("A question is waiting for an answer")]
    PromptPending,
    #[error("Nothing is waiting for an answer")]
    NoPendingPrompt,
    #[error("This game does not use {0} gating")]
    WrongGate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    AnchorCaptured,
    /// The loser has no pieces left.
    Annihilation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GameResult {
    Win { winner: Player, reason: WinReason },
    Draw,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Win {
                winner,
                reason: WinReason::AnchorCaptured,
            } => write!(f, "{} wins by capturing the anchor", winner),
            GameResult::Win {
                winner,
                reason: WinReason::Annihilation,
            } => write!(f, "{} wins by capturing every piece", winner),
            GameResult::Draw => write!(
                f,
                "Draw after {} moves without a capture",
                DRAW_THRESHOLD
            ),
        }
    }
}

/// One committed move, as handed to the move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub owner: Player,
    /// Kind after any promotion on this move.
    pub kind: PieceKind,
    pub from: Position,
    pub to: Position,
    pub captured: Option<PieceKind>,
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {} -> {}", self.owner, self.kind, self.from, self.to)?;
        if let Some(captured) = self.captured {
            write!(f, ", takes {}", captured)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "prompt", rename_all = "snake_case")]
pub enum PromptKind {
    Challenge { index: u8 },
    Promotion { at: Position },
}

/// A question the session is blocked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(flatten)]
    pub kind: PromptKind,
    pub question: String,
}

/// The suspended half of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Challenge {
        from: Position,
        to: Position,
        index: u8,
    },
    /// The board move is applied; the kind of the scout is undecided.
    Promotion {
        from: Position,
        to: Position,
        captured: Option<PieceKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    AwaitingSelection,
    PieceSelected {
        from: Position,
        destinations: Vec<Position>,
    },
    AwaitingAnswer(Pending),
}

/// What a single input did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Selected {
        from: Position,
        destinations: Vec<Position>,
    },
    /// Nothing selected and nothing to select.
    Ignored,
    Prompt(PromptRequest),
    Moved(MoveRecord),
    /// Wrong answer: the move is dropped and the turn passes.
    Denied,
    /// No answer: the move is dropped, the turn is kept.
    Cancelled,
}

/// One game: the board, whose turn it is, and everything in flight.
///
/// All inputs go through `&mut self`, so a move runs to completion before
/// the next input is looked at.
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    current_player: Player,
    moves_since_capture: u32,
    result: Option<GameResult>,
    phase: Phase,
    gate: Gate,
    bank: ChallengeBank,
    log: Vec<MoveRecord>,
    message: String,
}

impl GameSession {
    pub fn new(mode: GateMode, bank: ChallengeBank) -> Self {
        let mut session = GameSession {
            board: Board::new(),
            current_player: Player::West,
            moves_since_capture: 0,
            result: None,
            phase: Phase::AwaitingSelection,
            gate: Gate::new(mode, bank.clone()),
            bank,
            log: Vec::new(),
            message: String::new(),
        };
        session.message = session.turn_message();
        session
    }

    /// Back to the starting layout with every lock closed again.
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.current_player = Player::West;
        self.moves_since_capture = 0;
        self.result = None;
        self.phase = Phase::AwaitingSelection;
        self.gate.reset();
        self.log.clear();
        self.message = self.turn_message();
        info!(mode = self.gate.mode().name(), "new game");
    }

    /// Reset, switching gating policy.
    pub fn reset_with_mode(&mut self, mode: GateMode) {
        self.gate = Gate::new(mode, self.bank.clone());
        self.reset();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn moves_since_capture(&self) -> u32 {
        self.moves_since_capture
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn is_game_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn mode(&self) -> GateMode {
        self.gate.mode()
    }

    pub fn move_log(&self) -> &[MoveRecord] {
        &self.log
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn selected(&self) -> Option<Position> {
        match &self.phase {
            Phase::PieceSelected { from, .. } => Some(*from),
            _ => None,
        }
    }

    pub fn destinations(&self) -> &[Position] {
        match &self.phase {
            Phase::PieceSelected { destinations, .. } => destinations,
            _ => &[],
        }
    }

    pub fn pending_prompt(&self) -> Option<PromptRequest> {
        match self.phase {
            Phase::AwaitingAnswer(Pending::Challenge { index, .. }) => {
                let question = match &self.gate {
                    Gate::Unlock(gate) => gate.bank().get(index)?.question.clone(),
                    Gate::Permission(_) => return None,
                };
                Some(PromptRequest {
                    kind: PromptKind::Challenge { index },
                    question,
                })
            }
            Phase::AwaitingAnswer(Pending::Promotion { to, .. }) => {
                Some(promotion_prompt(to))
            }
            _ => None,
        }
    }

    fn ensure_accepting_input(&self) -> Result<(), GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        if matches!(self.phase, Phase::AwaitingAnswer(_)) {
            return Err(GameError::PromptPending);
        }
        Ok(())
    }

    /// A click on `pos`: selects one of our pieces, or tries to move the
    /// selected piece there.
    pub fn select_or_attempt_move(&mut self, pos: Position) -> Result<Outcome, GameError> {
        self.ensure_accepting_input()?;
        if !pos.in_bounds() {
            return Err(GameError::OutOfBounds {
                row: pos.row,
                col: pos.col,
            });
        }

        if let Some(piece) = self.board.get_piece(pos) {
            if piece.owner == self.current_player {
                return Ok(self.select(pos, piece));
            }
        }

        let Phase::PieceSelected { from, destinations } = &self.phase else {
            return Ok(Outcome::Ignored);
        };
        let from = *from;

        if !destinations.contains(&pos) {
            return Err(self.reject(GameError::IllegalDestination(pos)));
        }
        if let Err(err) = self.validate(from, pos) {
            return Err(self.reject(err));
        }

        match self.gate.check(pos) {
            GateDecision::Open => self.commit(from, pos),
            GateDecision::PermissionRequired => Err(self.reject(GameError::PermissionRequired)),
            GateDecision::Challenge { index, question } => {
                self.phase = Phase::AwaitingAnswer(Pending::Challenge {
                    from,
                    to: pos,
                    index,
                });
                self.message = format!("Cell {} is locked: {}", index, question);
                Ok(Outcome::Prompt(PromptRequest {
                    kind: PromptKind::Challenge { index },
                    question,
                }))
            }
        }
    }

    fn select(&mut self, from: Position, piece: Piece) -> Outcome {
        let destinations = rules::legal_moves(&self.board, piece, from);
        self.message = format!("{} at {}: {}", piece.kind, from, piece.kind.describe());
        self.phase = Phase::PieceSelected {
            from,
            destinations: destinations.clone(),
        };
        Outcome::Selected { from, destinations }
    }

    fn reject(&mut self, err: GameError) -> GameError {
        debug!(player = %self.current_player, error = %err, "move rejected");
        self.message = err.to_string();
        err
    }

    /// Rules checked at commit time for every piece.
    fn validate(&self, from: Position, to: Position) -> Result<(), GameError> {
        if rules::opens_facing(&self.board, from, to) {
            return Err(GameError::FacingViolation);
        }
        Ok(())
    }

    fn commit(&mut self, from: Position, to: Position) -> Result<Outcome, GameError> {
        if let Err(err) = self.validate(from, to) {
            return Err(self.reject(err));
        }
        let piece = self
            .board
            .get_piece(from)
            .ok_or(GameError::IllegalDestination(to))?;

        let captured = self.board.move_piece(from, to).map(|p| p.kind);
        if captured.is_some() {
            self.moves_since_capture = 0;
        } else {
            self.moves_since_capture += 1;
        }

        if rules::promotes(piece, to) {
            self.phase = Phase::AwaitingAnswer(Pending::Promotion { from, to, captured });
            let request = promotion_prompt(to);
            self.message = request.question.clone();
            return Ok(Outcome::Prompt(request));
        }

        Ok(Outcome::Moved(self.finish_move(from, to, captured)))
    }

    /// Log the move, then decide whether the game goes on.
    fn finish_move(
        &mut self,
        from: Position,
        to: Position,
        captured: Option<PieceKind>,
    ) -> MoveRecord {
        let kind = self
            .board
            .get_piece(to)
            .map_or(PieceKind::Scout, |p| p.kind);
        let record = MoveRecord {
            owner: self.current_player,
            kind,
            from,
            to,
            captured,
        };
        info!(
            owner = %record.owner,
            kind = %record.kind,
            from = %record.from,
            to = %record.to,
            captured = ?record.captured,
            "move"
        );
        self.log.push(record);
        self.phase = Phase::AwaitingSelection;

        self.check_game_end();
        if let Some(result) = self.result {
            self.message = result.to_string();
        } else {
            self.switch_player();
        }
        record
    }

    /// Reply to the pending prompt; `None` cancels.
    pub fn answer(&mut self, response: Option<&str>) -> Result<Outcome, GameError> {
        let Phase::AwaitingAnswer(pending) = self.phase else {
            return Err(GameError::NoPendingPrompt);
        };

        match pending {
            Pending::Challenge { from, to, index } => {
                let Gate::Unlock(gate) = &mut self.gate else {
                    return Err(GameError::WrongGate(GateMode::Unlock.name().to_string()));
                };
                match gate.submit(index, response) {
                    Resolution::Granted => {
                        self.phase = Phase::AwaitingSelection;
                        self.commit(from, to)
                    }
                    Resolution::Denied => {
                        debug!(index, player = %self.current_player, "wrong answer");
                        self.switch_player();
                        self.message = format!(
                            "Wrong answer, the turn passes to {}",
                            self.current_player
                        );
                        Ok(Outcome::Denied)
                    }
                    Resolution::Cancelled => {
                        self.phase = Phase::AwaitingSelection;
                        self.message = "Move cancelled".to_string();
                        Ok(Outcome::Cancelled)
                    }
                }
            }
            Pending::Promotion { from, to, captured } => {
                // Anything unrecognised keeps the scout
                let kind = response
                    .and_then(PieceKind::parse_promotion)
                    .unwrap_or(PieceKind::Scout);
                self.board.set_kind(to, kind);
                Ok(Outcome::Moved(self.finish_move(from, to, captured)))
            }
        }
    }

    /// Click, then answer any question it raises through `prompter`.
    pub fn play(
        &mut self,
        pos: Position,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome, GameError> {
        let mut outcome = self.select_or_attempt_move(pos)?;
        while let Outcome::Prompt(request) = &outcome {
            let response = prompter.ask(&request.question);
            outcome = self.answer(response.as_deref())?;
        }
        Ok(outcome)
    }

    /// Abandon any selection and hand the turn over.
    pub fn forfeit_turn(&mut self) -> Result<(), GameError> {
        self.ensure_accepting_input()?;
        self.switch_player();
        self.message = format!("Turn passed, {} to play", self.current_player);
        Ok(())
    }

    /// Base variant: the quiz was answered correctly, one move may be played.
    pub fn grant_permission(&mut self) -> Result<(), GameError> {
        self.ensure_accepting_input()?;
        let Gate::Permission(gate) = &mut self.gate else {
            return Err(GameError::WrongGate(GateMode::Permission.name().to_string()));
        };
        gate.grant();
        self.message = format!("{} may move", self.current_player);
        Ok(())
    }

    /// Base variant: the quiz was failed and the turn is lost.
    pub fn refuse_permission(&mut self) -> Result<(), GameError> {
        self.ensure_accepting_input()?;
        if !matches!(self.gate, Gate::Permission(_)) {
            return Err(GameError::WrongGate(GateMode::Permission.name().to_string()));
        }
        self.switch_player();
        self.message = format!("Wrong answer, the turn passes to {}", self.current_player);
        Ok(())
    }

    fn switch_player(&mut self) {
        self.current_player = self.current_player.opponent();
        self.phase = Phase::AwaitingSelection;
        self.gate.end_turn();
        self.message = self.turn_message();
    }

    fn turn_message(&self) -> String {
        match self.gate.mode() {
            GateMode::Permission => {
                format!("{} to play: answer the question to move", self.current_player)
            }
            GateMode::Unlock => format!("{} to play", self.current_player),
        }
    }

    fn check_game_end(&mut self) {
        let west_anchor = self.board.find(PieceKind::Anchor, Player::West);
        let east_anchor = self.board.find(PieceKind::Anchor, Player::East);

        let result = match (west_anchor, east_anchor) {
            (None, _) => Some(GameResult::Win {
                winner: Player::East,
                reason: WinReason::AnchorCaptured,
            }),
            (_, None) => Some(GameResult::Win {
                winner: Player::West,
                reason: WinReason::AnchorCaptured,
            }),
            _ => self.check_annihilation(),
        };

        let result = result.or_else(|| {
            (self.moves_since_capture >= DRAW_THRESHOLD).then_some(GameResult::Draw)
        });

        if let Some(result) = result {
            info!(%result, "game over");
            self.result = Some(result);
        }
    }

    fn check_annihilation(&self) -> Option<GameResult> {
        if rules::anchors_facing(&self.board) {
            return None;
        }
        let west = self.board.count_pieces(Player::West);
        let east = self.board.count_pieces(Player::East);
        let winner = match (west, east) {
            (0, n) if n > 0 => Player::East,
            (n, 0) if n > 0 => Player::West,
            _ => return None,
        };
        Some(GameResult::Win {
            winner,
            reason: WinReason::Annihilation,
        })
    }

    /// Everything a client needs to draw the game.
    pub fn snapshot(&self) -> Snapshot {
        let cells = (0..crate::board::ROWS)
            .map(|row| {
                (0..crate::board::COLS)
                    .map(|col| {
                        let pos = Position::new(row, col);
                        let cell = self.board.cell_at(pos);
                        CellView {
                            kind: cell.kind,
                            piece: cell.piece,
                            order: order_index_of(pos),
                        }
                    })
                    .collect()
            })
            .collect();

        Snapshot {
            cells,
            current_player: self.current_player,
            selected: self.selected(),
            destinations: self.destinations().to_vec(),
            moves_since_capture: self.moves_since_capture,
            game_over: self.is_game_over(),
            result: self.result,
            reason: self.result.map(|r| r.to_string()),
            message: self.message.clone(),
            prompt: self.pending_prompt(),
            mode: self.gate.mode(),
            permission_granted: matches!(&self.gate, Gate::Permission(g) if g.is_granted()),
            unlocked: self.gate.unlocked(),
            log: self.log.clone(),
        }
    }
}

fn promotion_prompt(at: Position) -> PromptRequest {
    PromptRequest {
        kind: PromptKind::Promotion { at },
        question: format!(
            "Promote the scout on {} to heavy, strong, light, swimmer or amphibious?",
            at
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub kind: CellKind,
    pub piece: Option<Piece>,
    /// Order index, `None` on the river.
    pub order: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cells: Vec<Vec<CellView>>,
    pub current_player: Player,
    pub selected: Option<Position>,
    pub destinations: Vec<Position>,
    pub moves_since_capture: u32,
    pub game_over: bool,
    pub result: Option<GameResult>,
    pub reason: Option<String>,
    pub message: String,
    pub prompt: Option<PromptRequest>,
    pub mode: GateMode,
    pub permission_granted: bool,
    pub unlocked: Vec<u8>,
    pub log: Vec<MoveRecord>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GateMode::Unlock, ChallengeBank::default())
    }
}
