use thiserror::Error;

use crate::status::TurnStatus;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: TurnStatus, to: TurnStatus },

    #[error("invalid turn: {0}")]
    InvalidTurn(String),

    #[error("sequence gap for turn {turn_id}: expected {expected}, got {actual}")]
    SequenceGap {
        turn_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
