//! Typed error hierarchy for the board back-end.
//!
//! `BoardError` is the single taxonomy shared by the aggregation query, the
//! pin toggle protocol, board creation and the HTTP layer. A server-declared
//! pin state that disagrees with the optimistic guess is not an error: it is
//! reported as `ToggleOutcome::RolledBack`.

use thiserror::Error;

pub type BoardResult<T> = Result<T, BoardError>;

/// Kind of document a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    User,
    Board,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::User => write!(f, "User"),
            DocumentKind::Board => write!(f, "Board"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("No signed-in user")]
    Unauthenticated,

    #[error("{kind} {id} not found")]
    NotFound { kind: DocumentKind, id: String },

    /// Network, store or index failure. Callers degrade or roll back.
    #[error("Transient failure: {0}")]
    Transient(#[source] anyhow::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("View state lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: DocumentKind::User,
            id: id.into(),
        }
    }

    pub fn board_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: DocumentKind::Board,
            id: id.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BoardError::Transient(_))
    }
}
