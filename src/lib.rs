pub mod board;
pub mod challenge;
pub mod config;
pub mod game;
pub mod gate;
pub mod piece;
pub mod rules;
pub mod web;

pub use board::*;
pub use challenge::*;
pub use config::*;
pub use game::*;
pub use gate::*;
pub use piece::*;
