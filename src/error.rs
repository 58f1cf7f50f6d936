//! Error types for the rule engine, the opponent and configuration.
//!
//! Rejected user moves are not errors: the session simply ignores them.

use crate::board::Color;

/// Errors raised while parsing squares or board layouts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("invalid piece character {0:?}")]
    InvalidPiece(char),

    #[error("invalid placement: {message}")]
    InvalidPlacement { message: String },
}

/// Errors raised by the engine when an internal invariant does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The opponent was asked to move in a position with no legal moves.
    #[error("{0} has no legal moves")]
    NoLegalMoves(Color),

    #[error("{0} king is missing from the board")]
    MissingKing(Color),

    #[error("{color} has {count} kings, expected exactly one")]
    KingCount { color: Color, count: usize },

    /// The side that just moved would still be in check.
    #[error("{0} is in check but it is not their turn")]
    WaitingSideInCheck(Color),
}

/// Errors raised while reading session configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
