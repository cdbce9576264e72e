//! Policies deciding whether a legal move may actually be played.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::board::Position;
use crate::challenge::{Challenge, ChallengeBank, order_index_of};
use crate::config::GateMode;

/// Answers questions synchronously on behalf of a player.
pub trait Prompter {
    /// Returns the answer, or `None` if the player cancelled.
    fn ask(&mut self, question: &str) -> Option<String>;
}

impl<F> Prompter for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn ask(&mut self, question: &str) -> Option<String> {
        self(question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Open,
    /// Base variant: the quiz for this turn has not been passed yet.
    PermissionRequired,
    /// Unlock variant: the cell's question must be answered first.
    Challenge { index: u8, question: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Granted,
    /// Wrong answer; the turn is lost.
    Denied,
    /// No answer given; the turn is kept.
    Cancelled,
}

/// One move per correctly answered quiz, not tied to any cell.
#[derive(Debug, Clone, Default)]
pub struct PermissionGate {
    granted: bool,
}

impl PermissionGate {
    pub fn grant(&mut self) {
        self.granted = true;
    }

    pub fn revoke(&mut self) {
        self.granted = false;
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

/// Cells stay locked until their question is answered; unlocks are shared
/// by both players and last for the rest of the game.
#[derive(Debug, Clone)]
pub struct UnlockGate {
    bank: ChallengeBank,
    unlocked: BTreeSet<u8>,
}

impl UnlockGate {
    pub fn new(bank: ChallengeBank) -> Self {
        UnlockGate {
            bank,
            unlocked: BTreeSet::new(),
        }
    }

    pub fn bank(&self) -> &ChallengeBank {
        &self.bank
    }

    pub fn unlocked(&self) -> &BTreeSet<u8> {
        &self.unlocked
    }

    pub fn is_unlocked(&self, index: u8) -> bool {
        self.unlocked.contains(&index)
    }

    /// The question still standing between a player and `index`, if any.
    pub fn challenge_for(&self, index: u8) -> Option<&Challenge> {
        if self.is_unlocked(index) || !self.bank.requires_challenge(index) {
            return None;
        }
        self.bank.get(index)
    }

    /// Judge a response to the challenge on `index`.
    ///
    /// Already open cells are granted whatever the response.
    pub fn submit(&mut self, index: u8, response: Option<&str>) -> Resolution {
        let Some(challenge) = self.challenge_for(index) else {
            return Resolution::Granted;
        };
        let Some(answer) = response else {
            return Resolution::Cancelled;
        };

        if challenge.accepts(answer) {
            self.unlocked.insert(index);
            info!(index, "cell unlocked");
            Resolution::Granted
        } else {
            Resolution::Denied
        }
    }

    /// Grant immediately if open, otherwise ask `prompter` and judge.
    pub fn resolve(&mut self, index: u8, prompter: &mut dyn Prompter) -> Resolution {
        let Some(challenge) = self.challenge_for(index) else {
            return Resolution::Granted;
        };
        let question = challenge.question.clone();
        let response = prompter.ask(&question);
        self.submit(index, response.as_deref())
    }

    pub fn reset(&mut self) {
        self.unlocked.clear();
    }
}

/// The gating policy of a game.
#[derive(Debug, Clone)]
pub enum Gate {
    Permission(PermissionGate),
    Unlock(UnlockGate),
}

impl Gate {
    pub fn new(mode: GateMode, bank: ChallengeBank) -> Self {
        match mode {
            GateMode::Permission => Gate::Permission(PermissionGate::default()),
            GateMode::Unlock => Gate::Unlock(UnlockGate::new(bank)),
        }
    }

    pub fn mode(&self) -> GateMode {
        match self {
            Gate::Permission(_) => GateMode::Permission,
            Gate::Unlock(_) => GateMode::Unlock,
        }
    }

    /// May a move onto `to` go ahead right now?
    pub fn check(&self, to: Position) -> GateDecision {
        match self {
            Gate::Permission(gate) if gate.is_granted() => GateDecision::Open,
            Gate::Permission(_) => GateDecision::PermissionRequired,
            Gate::Unlock(gate) => {
                let challenge = order_index_of(to)
                    .and_then(|index| gate.challenge_for(index).map(|c| (index, c)));
                match challenge {
                    Some((index, c)) => GateDecision::Challenge {
                        index,
                        question: c.question.clone(),
                    },
                    None => GateDecision::Open,
                }
            }
        }
    }

    /// Called whenever the turn passes to the other player.
    pub fn end_turn(&mut self) {
        if let Gate::Permission(gate) = self {
            gate.revoke();
        }
    }

    pub fn unlocked(&self) -> Vec<u8> {
        match self {
            Gate::Permission(_) => Vec::new(),
            Gate::Unlock(gate) => gate.unlocked().iter().copied().collect(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Gate::Permission(gate) => gate.revoke(),
            Gate::Unlock(gate) => gate.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ChallengeBank {
        ChallengeBank::from_json(
            r#"{
                "free": [1],
                "challenges": {
                    "15": { "question": "Thủ đô?", "answers": ["Hà Nội", "Hanoi"] },
                    "16": { "question": "Sông?", "answers": ["Mê Kông"] }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_correct_answer_unlocks_permanently() {
        let mut gate = UnlockGate::new(bank());
        assert!(gate.challenge_for(15).is_some());

        assert_eq!(gate.submit(15, Some("ha noi")), Resolution::Granted);
        assert!(gate.is_unlocked(15));
        assert!(gate.challenge_for(15).is_none());

        // Second resolution needs no answer at all
        assert_eq!(gate.submit(15, None), Resolution::Granted);
        assert_eq!(gate.submit(15, Some("wrong")), Resolution::Granted);
        assert_eq!(gate.unlocked().len(), 1);
    }

    #[test]
    fn test_wrong_and_cancelled_answers() {
        let mut gate = UnlockGate::new(bank());
        assert_eq!(gate.submit(16, Some("Hồng")), Resolution::Denied);
        assert_eq!(gate.submit(16, None), Resolution::Cancelled);
        assert!(!gate.is_unlocked(16));
        assert_eq!(gate.submit(16, Some("me kong")), Resolution::Granted);
    }

    #[test]
    fn test_free_and_unlisted_cells_are_granted() {
        let mut gate = UnlockGate::new(bank());
        assert_eq!(gate.submit(1, None), Resolution::Granted);
        assert_eq!(gate.submit(30, None), Resolution::Granted);
        // Free cells are not recorded as unlocked
        assert!(gate.unlocked().is_empty());
    }

    #[test]
    fn test_resolve_asks_only_when_locked() {
        let mut gate = UnlockGate::new(bank());
        let mut asked = Vec::new();
        let mut prompter = |q: &str| {
            asked.push(q.to_string());
            Some("Hanoi".to_string())
        };

        assert_eq!(gate.resolve(15, &mut prompter), Resolution::Granted);
        assert_eq!(gate.resolve(15, &mut prompter), Resolution::Granted);
        assert_eq!(gate.resolve(1, &mut prompter), Resolution::Granted);
        assert_eq!(asked, vec!["Thủ đô?".to_string()]);
    }

    #[test]
    fn test_gate_check_unlock_mode() {
        let gate = Gate::new(GateMode::Unlock, bank());
        // (0, 2) is order index 15
        assert_eq!(
            gate.check(Position::new(0, 2)),
            GateDecision::Challenge {
                index: 15,
                question: "Thủ đô?".to_string()
            }
        );
        assert_eq!(gate.check(Position::new(0, 0)), GateDecision::Open);
        // River cells carry no index
        assert_eq!(gate.check(Position::new(0, 4)), GateDecision::Open);
    }

    #[test]
    fn test_gate_check_permission_mode() {
        let mut gate = Gate::new(GateMode::Permission, bank());
        assert_eq!(
            gate.check(Position::new(0, 2)),
            GateDecision::PermissionRequired
        );
        if let Gate::Permission(p) = &mut gate {
            p.grant();
        }
        assert_eq!(gate.check(Position::new(0, 2)), GateDecision::Open);
        gate.end_turn();
        assert_eq!(
            gate.check(Position::new(0, 2)),
            GateDecision::PermissionRequired
        );
    }

    #[test]
    fn test_reset_relocks() {
        let mut gate = Gate::new(GateMode::Unlock, bank());
        if let Gate::Unlock(u) = &mut gate {
            u.submit(15, Some("Hanoi"));
        }
        assert_eq!(gate.unlocked(), vec![15]);
        gate.reset();
        assert!(gate.unlocked().is_empty());
    }
}
