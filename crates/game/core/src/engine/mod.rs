//! Command execution pipeline.
//!
//! The [`Executor`] turns a [`CommandRequest`] plus the current
//! [`GameState`](crate::GameState) into the ordered list of events the
//! command produces. It never mutates state: the caller appends the events
//! to its log and folds them with [`Event::apply`](crate::Event::apply).
//! [`replay`] is the matching projector used on startup.

mod builtin;
mod errors;
mod executor;
pub mod mapper;
mod projector;
mod request;

pub use errors::CommandError;
pub use executor::{Executor, ExecutorOptions};
pub use projector::{ReplayError, replay};
pub use request::{CommandRequest, GM, ParsedInput};

/// Commands that exist regardless of manifest contents.
pub const BUILTINS: [&str; 7] = ["roll", "help", "hint", "ask", "allow", "deny", "adjudicate"];

/// Joins a multi-word command with underscores and lower-cases it:
/// `"Encounter  Start"` becomes `"encounter_start"`.
pub fn canonical_command(command: &str) -> String {
    command
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

pub fn is_builtin(command: &str) -> bool {
    BUILTINS.contains(&command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_command() {
        assert_eq!(canonical_command("encounter start"), "encounter_start");
        assert_eq!(canonical_command("  Encounter   END "), "encounter_end");
        assert_eq!(canonical_command("grapple"), "grapple");
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("roll"));
        assert!(is_builtin("adjudicate"));
        assert!(!is_builtin("grapple"));
    }
}
