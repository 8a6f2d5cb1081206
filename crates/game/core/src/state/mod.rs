//! Authoritative game state projection.
//!
//! This module owns the data structures that describe entities, turn loops
//! and session metadata. Callers query this state freely but mutate it
//! exclusively through [`crate::Event::apply`]; the event log is the source
//! of truth and this projection is a cache of it.
mod entity;
mod error;
mod loops;

pub use entity::{Entity, Section};
pub use error::ApplyError;
pub use loops::Loop;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata key holding the single pending ask.
pub const PENDING_ASK: &str = "pending_ask";
/// Metadata key written by `CheckEvent`.
pub const LAST_CHECK: &str = "last_check";
/// Metadata key written by `allow` / `deny`.
pub const LAST_ADJUDICATION: &str = "last_adjudication";
/// Metadata flag that freezes non-GM input.
pub const FROZEN: &str = "frozen";

/// Top-level projection folded from the event log.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    entities: BTreeMap<String, Entity>,
    loops: BTreeMap<String, Loop>,
    metadata: BTreeMap<String, serde_json::Value>,
    /// Session bookkeeping for `hint`; not part of the replayed projection.
    #[serde(skip)]
    last_command: Option<String>,
}

impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
            && self.loops == other.loops
            && self.metadata == other.metadata
    }
}

impl GameState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a genesis state seeded with the given entities.
    ///
    /// Later entities replace earlier ones with the same id.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.id.clone(), e)).collect(),
            ..Default::default()
        }
    }

    pub fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn loops(&self) -> &BTreeMap<String, Loop> {
        &self.loops
    }

    pub fn get_loop(&self, name: &str) -> Option<&Loop> {
        self.loops.get(name)
    }

    /// Whether loop `name` exists and is active.
    pub fn is_loop_active(&self, name: &str) -> bool {
        self.loops.get(name).is_some_and(|l| l.active)
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Whether non-GM input is currently frozen.
    pub fn is_frozen(&self) -> bool {
        self.metadata
            .get(FROZEN)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Name of the most recently executed command.
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    /// Records the command that just completed (used by `hint`).
    pub fn record_command(&mut self, command: impl Into<String>) {
        self.last_command = Some(command.into());
    }

    /// SHA-256 hex digest of the canonical JSON serialization.
    ///
    /// All maps are ordered, so equal projections always share a digest.
    pub fn digest(&self) -> String {
        // Serializing string-keyed maps of plain data cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    pub(crate) fn entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub(crate) fn entities_mut(&mut self) -> &mut BTreeMap<String, Entity> {
        &mut self.entities
    }

    pub(crate) fn loop_mut(&mut self, name: &str) -> Option<&mut Loop> {
        self.loops.get_mut(name)
    }

    pub(crate) fn loops_mut(&mut self) -> &mut BTreeMap<String, Loop> {
        &mut self.loops
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut BTreeMap<String, serde_json::Value> {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_indexes_entities_by_id() {
        let state = GameState::with_entities([
            Entity::new("fighter", "Fighter"),
            Entity::new("goblin", "Goblin"),
        ]);
        assert!(state.contains_entity("fighter"));
        assert_eq!(state.entity("goblin").map(|e| e.name.as_str()), Some("Goblin"));
        assert!(!state.is_loop_active("encounter_start"));
    }

    #[test]
    fn test_equality_ignores_last_command() {
        let a = GameState::with_entities([Entity::new("fighter", "Fighter")]);
        let mut b = a.clone();
        b.record_command("grapple");
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(b.last_command(), Some("grapple"));
    }

    #[test]
    fn test_digest_changes_with_state() {
        let a = GameState::with_entities([Entity::new("fighter", "Fighter")]);
        let b = GameState::with_entities([Entity::new("fighter", "Fighter").with_stat("dex", 14)]);
        assert_ne!(a.digest(), b.digest());
    }
}
