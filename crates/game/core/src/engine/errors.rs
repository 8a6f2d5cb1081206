//! Error types for the command pipeline.

use crate::error::{ErrorSeverity, GameError};
use crate::formula::FormulaError;

/// Why a command produced no events.
///
/// Every variant leaves state and log untouched: the executor buffers its
/// output and returns events only when all phases succeed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },

    #[error("'{actor}' may not run '{command}'; it is restricted to the GM")]
    Unauthorized { command: String, actor: String },

    /// Missing or invalid parameter. `usage` is the command's `error` text.
    #[error("invalid parameter '{param}': {reason}")]
    Param {
        param: String,
        reason: String,
        usage: String,
    },

    /// A prerequisite returned `false`; `message` is its declared error.
    #[error("{message}")]
    Prereq { message: String },

    #[error("formula step '{step}' failed: {source}")]
    Formula {
        step: String,
        #[source]
        source: FormulaError,
    },

    /// Out-of-turn or frozen input. Produces neither events nor feedback.
    #[error("command silently ignored")]
    SilentIgnore,
}

impl CommandError {
    pub(crate) fn formula(step: &str, source: impl Into<FormulaError>) -> Self {
        Self::Formula {
            step: step.to_string(),
            source: source.into(),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::SilentIgnore)
    }

    /// Usage text worth showing alongside the message, if any.
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::Param { usage, .. } if !usage.is_empty() => Some(usage),
            _ => None,
        }
    }
}

impl GameError for CommandError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownCommand { .. } | Self::Unauthorized { .. } | Self::Param { .. } => {
                ErrorSeverity::Validation
            }
            Self::Prereq { .. } | Self::SilentIgnore => ErrorSeverity::Recoverable,
            Self::Formula { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownCommand { .. } => "UnknownCommandError",
            Self::Unauthorized { .. } => "UnauthorizedError",
            Self::Param { .. } => "ParamError",
            Self::Prereq { .. } => "PrereqError",
            Self::Formula { .. } => "FormulaError",
            Self::SilentIgnore => "SilentIgnore",
        }
    }
}
