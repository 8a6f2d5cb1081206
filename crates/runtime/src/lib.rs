//! Session runtime for manifest-driven tabletop campaigns.
//!
//! This crate wires the pure `game-core` pipeline to durable storage and to
//! front-ends:
//! - [`repository`]: the append-only event log ([`FileEventLog`] on disk,
//!   [`InMemoryEventLog`] for tests)
//! - [`surface`]: raw text to [`game_core::ParsedInput`] ([`KeywordParser`])
//! - [`Session`]: replay on startup, then parse, execute, append and apply
//! - [`SessionWorker`] / [`SessionHandle`]: a single-writer task with a
//!   bounded submission queue, for front-ends with several input sources
pub mod error;
pub mod handle;
pub mod repository;
pub mod session;
pub mod surface;
pub mod worker;

pub use error::{Result, SessionError};
pub use handle::SessionHandle;
pub use repository::{EventRepository, FileEventLog, InMemoryEventLog, RepositoryError};
pub use session::{Session, SessionBuilder};
pub use surface::{KeywordParser, ParseError, SurfaceParser};
pub use worker::{Command, SessionWorker};
