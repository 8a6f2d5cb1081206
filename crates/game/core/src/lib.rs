//! Deterministic tabletop session rules shared across front-ends.
//!
//! `game-core` defines the canonical session model (entities, loops, events)
//! and the manifest-driven command pipeline, and exposes pure APIs that can
//! be reused by the runtime and offline tools. All state mutation flows
//! through [`Event::apply`]; commands become events through
//! [`engine::Executor`], and [`engine::replay`] rebuilds state from a log.
pub mod context;
pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod formula;
pub mod manifest;
pub mod state;
pub mod value;

pub use context::ContextBridge;
pub use engine::{
    CommandError, CommandRequest, Executor, ExecutorOptions, GM, ParsedInput, ReplayError,
    canonical_command, replay,
};
pub use env::{
    DataLoader, DiceError, DiceExpr, DiceRoller, FixedRoller, RandomRoller, ScriptedRoller,
    StaticLoader,
};
pub use error::{ErrorSeverity, GameError};
pub use event::Event;
pub use formula::{DiceReporter, Evaluator, FormulaError, Program};
pub use manifest::{CommandDef, Manifest, ManifestError, ParamDef, ParamType, StepDef};
pub use state::{ApplyError, Entity, GameState, Loop, Section};
pub use value::{Value, ValueMap};
