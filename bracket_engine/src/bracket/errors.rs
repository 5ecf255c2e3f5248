//! Bracket error types.

use super::models::{MatchId, MatchStatus, TournamentId};
use thiserror::Error;

/// Coarse error category, used by callers to choose a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    NotFound,
    InvalidState,
    Conflict,
    StorageFault,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Malformed or insufficient input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Match is not in the state the operation requires
    #[error("Match {match_id} not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        match_id: MatchId,
        expected: MatchStatus,
        actual: MatchStatus,
    },

    /// A bracket already exists for the tournament
    #[error("Bracket already generated for tournament {0}")]
    AlreadyGenerated(TournamentId),

    /// Conditional update kept losing to concurrent writers
    #[error("Concurrent update conflict on match {match_id} after {attempts} attempts")]
    Conflict { match_id: MatchId, attempts: u32 },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage fault outside of SQL (bad row, backend failure)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BracketError {
    pub fn match_not_found(match_id: MatchId) -> Self {
        BracketError::NotFound {
            entity: "Match",
            id: match_id,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InvalidInput(_) => ErrorKind::Input,
            BracketError::NotFound { .. } => ErrorKind::NotFound,
            BracketError::InvalidState { .. } => ErrorKind::InvalidState,
            BracketError::AlreadyGenerated(_) | BracketError::Conflict { .. } => {
                ErrorKind::Conflict
            }
            BracketError::Database(_) | BracketError::Storage(_) => ErrorKind::StorageFault,
        }
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Storage(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
