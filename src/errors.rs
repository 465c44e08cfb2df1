//! Typed error hierarchy for the task board.
//!
//! `BoardError` is shared by the store (`board::db`) and the HTTP layer
//! (`board::api`). Each variant maps to exactly one response class:
//! - `Validation`: malformed or missing input (400)
//! - `*NotFound`: a referenced record does not exist (404)
//! - `Database` / `LockPoisoned`: unexpected store failure (500)

use thiserror::Error;

pub type Result<T, E = BoardError> = std::result::Result<T, E>;

/// Errors from board, column and task operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{0}")]
    Validation(String),

    #[error("Board not found")]
    BoardNotFound { id: String },

    #[error("Column not found")]
    ColumnNotFound { id: String },

    #[error("Task not found")]
    TaskNotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl BoardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for the variants that describe a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BoardNotFound { .. } | Self::ColumnNotFound { .. } | Self::TaskNotFound { .. }
        )
    }

    /// True for failures the caller cannot fix by changing the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::LockPoisoned)
    }
}
