use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::challenge::ChallengeBank;

/// Moves without a capture after which the game is drawn.
pub const DRAW_THRESHOLD: u32 = 40;

/// How a player earns the right to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// An external quiz grants one move per turn.
    Permission,
    /// Numbered cells are locked until their trivia question is answered.
    Unlock,
}

impl GateMode {
    pub fn name(&self) -> &str {
        match self {
            GateMode::Permission => "permission",
            GateMode::Unlock => "unlock",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid challenge bank: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cell index {0} is not on the board")]
    IndexOutOfRange(u8),
    #[error("Challenge for cell {0} has no usable answer")]
    NoAnswers(u8),
}

/// Command-line configuration for the game server.
#[derive(Debug, Clone, Parser)]
#[command(name = "cothu", about = "River & fortress animal chess")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Move gating used for new games
    #[arg(long, value_enum, default_value_t = GateMode::Unlock)]
    pub mode: GateMode,

    /// JSON challenge bank replacing the built-in questions
    #[arg(long)]
    pub challenges: Option<PathBuf>,

    /// Directory of static files for the browser client
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn challenge_bank(&self) -> Result<ChallengeBank, ConfigError> {
        match &self.challenges {
            Some(path) => ChallengeBank::load(path),
            None => ChallengeBank::builtin(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            mode: GateMode::Unlock,
            challenges: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let parsed = ServerConfig::parse_from(["cothu"]);
        let default = ServerConfig::default();
        assert_eq!(parsed.bind, default.bind);
        assert_eq!(parsed.mode, default.mode);
        assert_eq!(parsed.challenges, default.challenges);
        assert_eq!(parsed.static_dir, default.static_dir);
    }

    #[test]
    fn test_parse_mode_and_bank() {
        let parsed = ServerConfig::parse_from([
            "cothu",
            "--mode",
            "permission",
            "--challenges",
            "bank.json",
            "--bind",
            "0.0.0.0:8080",
        ]);
        assert_eq!(parsed.mode, GateMode::Permission);
        assert_eq!(parsed.challenges, Some(PathBuf::from("bank.json")));
        assert_eq!(parsed.bind.port(), 8080);
    }

    #[test]
    fn test_missing_bank_file_is_io_error() {
        let config = ServerConfig {
            challenges: Some(PathBuf::from("/nonexistent/bank.json")),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.challenge_bank(),
            Err(ConfigError::Io { .. })
        ));
    }
}
