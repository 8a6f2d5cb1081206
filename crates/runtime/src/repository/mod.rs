//! Event log persistence.
//!
//! The log is the source of truth for a campaign: every committed event is
//! appended here before the in-memory projection changes, and the projection
//! is rebuilt from it on startup.
mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileEventLog;
pub use memory::InMemoryEventLog;
pub use traits::EventRepository;
