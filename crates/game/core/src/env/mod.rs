//! Collaborators the core reads from but never writes to.
//!
//! The [`DataLoader`] exposes static entity templates and equipment; the
//! [`DiceRoller`] is the only source of randomness.
mod dice;
mod loader;

pub use dice::{
    DiceError, DiceExpr, DiceRoller, FixedRoller, MAX_DICE, MAX_SIDES, RandomRoller,
    ScriptedRoller,
};
pub use loader::{DataLoader, StaticLoader};
