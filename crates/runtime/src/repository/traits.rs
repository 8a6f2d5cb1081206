//! Repository contract for the append-only event log.

use game_core::Event;

use super::Result;

/// Append-only event log.
///
/// Implementations must make an appended event durable before returning:
/// the session applies an event to its projection only after `append`
/// succeeds.
pub trait EventRepository: Send {
    /// Append one event.
    ///
    /// Returns the position where the event was written (byte offset for
    /// files, index for memory).
    fn append(&mut self, event: &Event) -> Result<u64>;

    /// Read every event in append order.
    ///
    /// Fails on the first malformed record rather than skipping it.
    fn load(&self) -> Result<Vec<Event>>;

    /// Flush buffered writes to the underlying storage.
    fn flush(&mut self) -> Result<()>;

    /// Number of events appended through this handle plus those present
    /// when it was opened.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the log. Further appends are a caller error.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}
