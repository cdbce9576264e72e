use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::board::{COLS, Position, RIVER_COL, ROWS};
use crate::config::ConfigError;

/// Highest order index on the board (every non-river cell is numbered).
pub const MAX_ORDER_INDEX: u8 = (ROWS * (COLS - 1)) as u8;

const DEFAULT_BANK: &str = include_str!("../assets/challenges.json");

/// Fixed number of a cell, or `None` for the river column.
///
/// Numbering skips the river and snakes through the remaining columns:
/// down the even ones, up the odd ones, starting at 1 in the top-left.
pub fn order_index_of(pos: Position) -> Option<u8> {
    if !pos.in_bounds() || pos.col == RIVER_COL {
        return None;
    }
    let effective = if pos.col > RIVER_COL {
        pos.col - 1
    } else {
        pos.col
    };
    let start = effective * ROWS + 1;
    let index = if effective % 2 == 0 {
        start + pos.row
    } else {
        start + (ROWS - 1 - pos.row)
    };
    Some(index as u8)
}

/// Canonical form used to compare free-text answers.
///
/// Case-folds, strips diacritics, drops anything that is not a letter, digit
/// or whitespace, and collapses runs of whitespace to a single space.
pub fn normalize_answer(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'đ' { 'd' } else { c })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub question: String,
    /// Accepted answers as written; compared after normalisation.
    pub answers: Vec<String>,
}

impl Challenge {
    pub fn accepts(&self, answer: &str) -> bool {
        let given = normalize_answer(answer);
        !given.is_empty()
            && self
                .answers
                .iter()
                .any(|accepted| normalize_answer(accepted) == given)
    }
}

/// Trivia keyed by cell order index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChallengeBank {
    /// Indices that never need a challenge.
    #[serde(default)]
    pub free: BTreeSet<u8>,
    #[serde(default)]
    pub challenges: BTreeMap<u8, Challenge>,
}

impl ChallengeBank {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let bank: ChallengeBank = serde_json::from_str(json)?;
        bank.validate()?;
        Ok(bank)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The bank shipped with the game.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(DEFAULT_BANK)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |index: u8| index == 0 || index > MAX_ORDER_INDEX;

        if let Some(&index) = self.free.iter().find(|&&i| out_of_range(i)) {
            return Err(ConfigError::IndexOutOfRange(index));
        }
        for (&index, challenge) in &self.challenges {
            if out_of_range(index) {
                return Err(ConfigError::IndexOutOfRange(index));
            }
            if challenge
                .answers
                .iter()
                .all(|a| normalize_answer(a).is_empty())
            {
                return Err(ConfigError::NoAnswers(index));
            }
        }
        Ok(())
    }

    pub fn is_free(&self, index: u8) -> bool {
        self.free.contains(&index)
    }

    /// A cell needs a challenge when it is not free and one is on file for it.
    pub fn requires_challenge(&self, index: u8) -> bool {
        !self.is_free(index) && self.challenges.contains_key(&index)
    }

    pub fn get(&self, index: u8) -> Option<&Challenge> {
        self.challenges.get(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_index_snakes_around_river() {
        // First column runs top to bottom
        assert_eq!(order_index_of(Position::new(0, 0)), Some(1));
        assert_eq!(order_index_of(Position::new(6, 0)), Some(7));
        // Second column runs bottom to top
        assert_eq!(order_index_of(Position::new(6, 1)), Some(8));
        assert_eq!(order_index_of(Position::new(0, 1)), Some(14));
        assert_eq!(order_index_of(Position::new(0, 3)), Some(28));
        // The river is unnumbered and the next column continues from 29
        assert_eq!(order_index_of(Position::new(2, RIVER_COL)), None);
        assert_eq!(order_index_of(Position::new(0, 5)), Some(29));
        assert_eq!(order_index_of(Position::new(0, 8)), Some(56));
        assert_eq!(order_index_of(Position::new(7, 0)), None);
    }

    #[test]
    fn test_order_index_is_a_bijection() {
        let mut seen = BTreeSet::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                if let Some(index) = order_index_of(Position::new(row, col)) {
                    assert!(seen.insert(index), "duplicate index {index}");
                }
            }
        }
        assert_eq!(seen.len(), MAX_ORDER_INDEX as usize);
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&MAX_ORDER_INDEX));
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Hà   Nội! "), "ha noi");
        assert_eq!(normalize_answer("ĐÀ NẴNG"), "da nang");
        assert_eq!(normalize_answer("Hồ Chí-Minh"), "ho chiminh");
        assert_eq!(normalize_answer("1945."), "1945");
        assert_eq!(normalize_answer("?!"), "");
    }

    #[test]
    fn test_challenge_accepts_variants() {
        let challenge = Challenge {
            question: "Thủ đô của Việt Nam?".to_string(),
            answers: vec!["Hà Nội".to_string(), "Hanoi".to_string()],
        };
        assert!(challenge.accepts("ha noi"));
        assert!(challenge.accepts("HÀ  NỘI"));
        assert!(challenge.accepts("hanoi"));
        assert!(!challenge.accepts("Huế"));
        assert!(!challenge.accepts(""));
    }

    #[test]
    fn test_requires_challenge() {
        let bank = ChallengeBank::from_json(
            r#"{
                "free": [1, 2],
                "challenges": {
                    "2": { "question": "q2", "answers": ["a"] },
                    "3": { "question": "q3", "answers": ["b"] }
                }
            }"#,
        )
        .unwrap();

        assert!(!bank.requires_challenge(1));
        assert!(!bank.requires_challenge(2)); // free wins over an entry
        assert!(bank.requires_challenge(3));
        assert!(!bank.requires_challenge(4)); // no entry
    }

    #[test]
    fn test_bank_rejects_bad_indices() {
        let err = ChallengeBank::from_json(
            r#"{ "challenges": { "57": { "question": "q", "answers": ["a"] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IndexOutOfRange(57)));

        let err = ChallengeBank::from_json(r#"{ "free": [0] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::IndexOutOfRange(0)));

        let err = ChallengeBank::from_json(
            r#"{ "challenges": { "5": { "question": "q", "answers": ["--"] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NoAnswers(5)));
    }

    #[test]
    fn test_builtin_bank_loads() {
        let bank = ChallengeBank::builtin().unwrap();
        assert!(!bank.challenges.is_empty());
        // Home columns are free so the opening moves are never gated
        for row in 0..ROWS {
            for col in [0, 1, 7, 8] {
                let index = order_index_of(Position::new(row, col)).unwrap();
                assert!(!bank.requires_challenge(index));
            }
        }
    }
}
