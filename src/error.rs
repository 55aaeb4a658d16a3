//! Error types shared by the store, the parser and the sync engine.

use thiserror::Error;

use crate::jira::RemoteError;
use crate::timeparse::ParseError;

/// Errors surfaced by library operations.
#[derive(Error, Debug)]
pub enum TimelogError {
    /// User supplied time or duration could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A pending session, worklog or comment does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Jira rejected the request or could not be reached.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Store file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store file is not valid JSON for the expected layout.
    #[error("Invalid store file: {0}")]
    Json(#[from] serde_json::Error),
}

impl TimelogError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TimelogError>;
