//! Errors raised while applying events to the projection.

use crate::error::{ErrorSeverity, GameError};
use crate::state::Section;

/// An event could not be applied to the current state.
///
/// `apply` either accepts an event completely or rejects it with one of
/// these variants and leaves the state untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("unknown entity '{id}'")]
    UnknownEntity { id: String },

    #[error("entity '{id}' already exists")]
    DuplicateEntity { id: String },

    #[error("entity id must not be empty")]
    EmptyEntityId,

    #[error("unknown loop '{name}'")]
    UnknownLoop { name: String },

    /// `0 <= spent[key] <= resources[key]` would no longer hold.
    #[error("spent {key} on '{actor}' would be {spent}, outside 0..={limit}")]
    SpentOutOfRange {
        actor: String,
        key: String,
        spent: i64,
        limit: i64,
    },

    #[error("negative {section} value {value} for '{key}' on '{actor}'")]
    NegativeValue {
        actor: String,
        section: Section,
        key: String,
        value: i64,
    },

    #[error("{section}.{key} expects {expected}, got {found}")]
    AttributeType {
        section: Section,
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("unknown attribute section '{section}'")]
    UnknownSection { section: String },

    #[error("metadata key must not be empty")]
    EmptyMetadataKey,
}

impl GameError for ApplyError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        use ApplyError::*;
        match self {
            UnknownEntity { .. } => "APPLY_UNKNOWN_ENTITY",
            DuplicateEntity { .. } => "APPLY_DUPLICATE_ENTITY",
            EmptyEntityId => "APPLY_EMPTY_ENTITY_ID",
            UnknownLoop { .. } => "APPLY_UNKNOWN_LOOP",
            SpentOutOfRange { .. } => "APPLY_SPENT_OUT_OF_RANGE",
            NegativeValue { .. } => "APPLY_NEGATIVE_VALUE",
            AttributeType { .. } => "APPLY_ATTRIBUTE_TYPE",
            UnknownSection { .. } => "APPLY_UNKNOWN_SECTION",
            EmptyMetadataKey => "APPLY_EMPTY_METADATA_KEY",
        }
    }
}
