//! Event log projection.

use crate::error::{ErrorSeverity, GameError};
use crate::event::Event;
use crate::state::{ApplyError, GameState};

/// A logged event could not be applied during replay.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("event #{event_index} failed to apply: {source}")]
pub struct ReplayError {
    /// Zero-based position of the event in the log.
    pub event_index: usize,
    #[source]
    pub source: ApplyError,
}

impl GameError for ReplayError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        "ReplayError"
    }
}

/// Folds `events` over `genesis`. Deterministic: the same inputs always
/// produce the same state.
pub fn replay<'a>(
    genesis: GameState,
    events: impl IntoIterator<Item = &'a Event>,
) -> Result<GameState, ReplayError> {
    events
        .into_iter()
        .enumerate()
        .try_fold(genesis, |mut state, (event_index, event)| {
            event
                .apply(&mut state)
                .map_err(|source| ReplayError {
                    event_index,
                    source,
                })?;
            Ok(state)
        })
}
