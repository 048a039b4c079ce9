//! Chat turn orchestration: recording, streaming, finalizing

pub mod image;
pub mod prompt;
pub mod reconcile;
pub mod stream;
pub mod turn;

pub use turn::{ChatTurn, TurnRecord};
