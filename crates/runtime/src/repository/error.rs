//! Error types raised by event log implementations.

use thiserror::Error;

/// Errors surfaced by event log implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event log lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid event JSON: {message}")]
    Json { line: usize, message: String },

    #[error("line {line}: unknown event type '{tag}'")]
    UnknownTag { line: usize, tag: String },

    /// The final record has no terminating newline: a write was torn.
    #[error("line {line}: truncated record at end of log")]
    CorruptedTail { line: usize },

    #[error("event log is read-only")]
    ReadOnly,

    /// An append failed and its partial record could not be cut off.
    #[error("event log has a torn record at byte {offset}; restart to recover")]
    TornWrite { offset: u64 },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
