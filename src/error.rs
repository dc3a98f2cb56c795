//! Error types for the message board.

use crate::types::MessageId;
use thiserror::Error;

/// Main error type for board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    /// A required field was missing or empty. Raised before any store or bus
    /// interaction.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// The record store failed to commit or read.
    #[error("Store error: {0}")]
    Store(String),

    /// Delivery to a subscriber's transport failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BoardError {
    /// Stable machine-readable name for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardError::Validation(_) => "validation",
            BoardError::NotFound(_) => "not_found",
            BoardError::Store(_) => "store",
            BoardError::Transport(_) => "transport",
        }
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Validation(e.to_string())
    }
}

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;
