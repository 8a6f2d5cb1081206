//! Session-level error types.

use game_core::{ApplyError, CommandError, ErrorSeverity, GameError, ReplayError};

use crate::repository::RepositoryError;
use crate::surface::ParseError;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Everything a session call can fail with.
///
/// `SilentIgnore` never surfaces here: the session turns it into an empty,
/// successful result.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{message}")]
    Parse { message: String, usage: String },

    #[error(transparent)]
    Command(CommandError),

    #[error("event log failure: {0}")]
    Storage(#[from] RepositoryError),

    #[error("campaign log could not be replayed: {0}")]
    Replay(#[from] ReplayError),

    /// The command produced an event the current state rejects; nothing
    /// was written.
    #[error("{event} (event #{index} of the command) cannot be applied: {source}")]
    InvalidEvent {
        index: usize,
        event: &'static str,
        #[source]
        source: ApplyError,
    },

    /// A logged event failed to apply; restart to replay the log.
    #[error("session state diverged from the event log; restart to replay")]
    Diverged,

    #[error("session is missing its {0}")]
    Incomplete(&'static str),

    #[error("session worker has stopped")]
    WorkerClosed,
}

impl From<ParseError> for SessionError {
    fn from(err: ParseError) -> Self {
        Self::Parse {
            message: err.message,
            usage: err.usage,
        }
    }
}

impl From<CommandError> for SessionError {
    fn from(err: CommandError) -> Self {
        Self::Command(err)
    }
}

impl SessionError {
    /// Remedial usage text, when the failure came from malformed input.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::Parse { usage, .. } => Some(usage),
            Self::Command(err) => err.usage(),
            _ => None,
        }
    }
}

impl GameError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Parse { .. } => ErrorSeverity::Validation,
            Self::Command(err) => err.severity(),
            Self::Storage(_) | Self::InvalidEvent { .. } => ErrorSeverity::Internal,
            Self::Replay(_) | Self::Diverged | Self::Incomplete(_) | Self::WorkerClosed => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "ParseError",
            Self::Command(err) => err.error_code(),
            Self::Storage(_) => "StorageError",
            Self::Replay(_) => "ReplayError",
            Self::InvalidEvent { .. } => "InvalidEventError",
            Self::Diverged => "DivergedError",
            Self::Incomplete(_) => "ConfigurationError",
            Self::WorkerClosed => "WorkerClosedError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let parse = SessionError::from(ParseError {
            message: "nothing to do".into(),
            usage: "grapple by: <actor>".into(),
        });
        assert_eq!(parse.error_code(), "ParseError");
        assert_eq!(parse.usage(), Some("grapple by: <actor>"));
        assert_eq!(parse.severity(), ErrorSeverity::Validation);

        let prereq = SessionError::from(CommandError::Prereq {
            message: "You have no actions left this turn.".into(),
        });
        assert_eq!(prereq.to_string(), "You have no actions left this turn.");
        assert!(prereq.severity().is_recoverable());

        assert_eq!(SessionError::Diverged.severity(), ErrorSeverity::Fatal);
    }
}
