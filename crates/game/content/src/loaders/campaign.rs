//! File-backed [`DataLoader`].

use std::collections::BTreeMap;

use game_core::{DataLoader, Entity, Value};

/// Characters and weapons of one campaign, loaded once at startup.
///
/// Entities keep their file order, which is also the genesis order.
#[derive(Clone, Debug, Default)]
pub struct CampaignData {
    entities: Vec<Entity>,
    weapons: BTreeMap<String, Value>,
}

impl CampaignData {
    pub fn new(entities: Vec<Entity>, weapons: BTreeMap<String, Value>) -> Self {
        Self { entities, weapons }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn weapon_names(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(String::as_str)
    }
}

impl DataLoader for CampaignData {
    fn entities(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    fn entity(&self, id: &str) -> Option<Entity> {
        self.entities.iter().find(|e| e.id == id).cloned()
    }

    fn weapon(&self, name: &str) -> Option<Value> {
        self.weapons.get(&name.to_lowercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_are_case_insensitive_for_weapons() {
        let mut weapons = BTreeMap::new();
        weapons.insert("dagger".to_string(), Value::map([("dice", Value::from("1d4"))]));
        let data = CampaignData::new(vec![Entity::new("fighter", "Fighter")], weapons);

        assert_eq!(data.entity("fighter").map(|e| e.name), Some("Fighter".to_string()));
        assert!(data.entity("goblin").is_none());
        assert!(data.weapon("Dagger").is_some());
        assert_eq!(data.weapon_names().collect::<Vec<_>>(), ["dagger"]);
    }
}
