//! Read-only static data consumed by the executor and the projector.

use std::collections::BTreeMap;

use crate::state::Entity;
use crate::value::Value;

/// Source of entity templates and equipment lookups.
///
/// Implementations are read-only and may be shared across threads. The
/// file-backed implementation lives in `game-content`; [`StaticLoader`]
/// serves tests and embedded content.
pub trait DataLoader: Send + Sync {
    /// Every entity template, used to seed the genesis state.
    fn entities(&self) -> Vec<Entity>;

    /// One entity template by id.
    fn entity(&self, id: &str) -> Option<Entity> {
        self.entities().into_iter().find(|e| e.id == id)
    }

    /// Weapon definition (`dice`, `type`, `bonus`, ...) by name.
    fn weapon(&self, name: &str) -> Option<Value>;
}

/// In-memory [`DataLoader`].
#[derive(Clone, Debug, Default)]
pub struct StaticLoader {
    entities: BTreeMap<String, Entity>,
    weapons: BTreeMap<String, Value>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    #[must_use]
    pub fn with_weapon(mut self, name: impl Into<String>, weapon: Value) -> Self {
        self.weapons.insert(name.into().to_lowercase(), weapon);
        self
    }
}

impl DataLoader for StaticLoader {
    fn entities(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    fn entity(&self, id: &str) -> Option<Entity> {
        self.entities.get(id).cloned()
    }

    fn weapon(&self, name: &str) -> Option<Value> {
        self.weapons.get(&name.to_lowercase()).cloned()
    }
}
