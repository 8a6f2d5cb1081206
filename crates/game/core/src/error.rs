//! Common error infrastructure for game-core.
//!
//! Domain-specific errors (`FormulaError`, `ApplyError`, `CommandError`) are
//! defined next to the code that raises them. This module provides the shared
//! classification that front-ends use to decide how to present a failure.

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// The same input may succeed later (e.g. out of actions this turn).
    Recoverable,

    /// Invalid input that should be corrected before retrying.
    ///
    /// Examples: unknown command, missing parameter, unauthorized actor
    Validation,

    /// A manifest or rules fault; the command cannot succeed until the
    /// manifest changes.
    ///
    /// Examples: formula type error, event that violates a state invariant
    Internal,

    /// The session cannot continue without operator intervention.
    ///
    /// Examples: corrupted log, replay failure, diverged projection
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates a rules or storage fault.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all game-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
/// - `error_code` returns the stable taxonomy tag (`PrereqError`, ...)
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
