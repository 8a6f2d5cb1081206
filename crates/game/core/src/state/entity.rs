//! Entity model: the atomic actor tracked by the session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ApplyError;

/// Named map on an entity that attribute events can address.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Section {
    Stats,
    Resources,
    Spent,
    Proficiencies,
    Inventory,
    Statuses,
    Classes,
}

impl Section {
    /// Whether entries in this section are integers (otherwise strings).
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Section::Stats
                | Section::Resources
                | Section::Spent
                | Section::Proficiencies
                | Section::Inventory
        )
    }
}

/// Any actor tracked in state (player character, monster, NPC).
///
/// Every map is always present, possibly empty, so formulas see `{}` rather
/// than a missing reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Genre tags such as `undead` or `construct`.
    pub types: BTreeSet<String>,
    /// Categorical attributes (`size: medium`, `category: monster`).
    pub classes: BTreeMap<String, String>,
    pub stats: BTreeMap<String, i64>,
    /// Per-turn budgets and pools (`actions`, `reactions`, `hp`).
    pub resources: BTreeMap<String, i64>,
    /// Consumption tracked against `resources`.
    pub spent: BTreeMap<String, i64>,
    /// Ordered; never holds duplicates.
    pub conditions: Vec<String>,
    pub proficiencies: BTreeMap<String, i64>,
    pub statuses: BTreeMap<String, String>,
    pub inventory: BTreeMap<String, i64>,
}

impl Entity {
    /// Creates an empty entity with the given id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style stat assignment.
    #[must_use]
    pub fn with_stat(mut self, key: impl Into<String>, value: i64) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    /// Builder-style resource assignment.
    #[must_use]
    pub fn with_resource(mut self, key: impl Into<String>, value: i64) -> Self {
        self.resources.insert(key.into(), value);
        self
    }

    /// Builder-style spent assignment.
    #[must_use]
    pub fn with_spent(mut self, key: impl Into<String>, value: i64) -> Self {
        self.spent.insert(key.into(), value);
        self
    }

    /// Builder-style class assignment.
    #[must_use]
    pub fn with_class(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.classes.insert(key.into(), value.into());
        self
    }

    /// Remaining amount of a resource (`resources[key] - spent[key]`).
    pub fn remaining(&self, key: &str) -> i64 {
        let total = self.resources.get(key).copied().unwrap_or(0);
        let spent = self.spent.get(key).copied().unwrap_or(0);
        total - spent
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c == condition)
    }

    /// First condition starting with `prefix` (e.g. `grappledby:`).
    pub fn condition_with_prefix(&self, prefix: &str) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| c.starts_with(prefix))
            .map(String::as_str)
    }

    /// Size class from `classes.size`, empty when unset.
    pub fn size(&self) -> &str {
        self.classes.get("size").map(String::as_str).unwrap_or("")
    }

    /// Category from `classes.category`, empty when unset.
    pub fn category(&self) -> &str {
        self.classes.get("category").map(String::as_str).unwrap_or("")
    }

    /// Checks `0 <= spent[k] <= resources[k]` for every spent key.
    ///
    /// A spent key without a matching resource only has to be non-negative.
    pub fn check_spent(&self) -> Result<(), ApplyError> {
        for (key, &spent) in &self.spent {
            if spent < 0 {
                return Err(ApplyError::NegativeValue {
                    actor: self.id.clone(),
                    section: Section::Spent,
                    key: key.clone(),
                    value: spent,
                });
            }
            if let Some(&limit) = self.resources.get(key)
                && spent > limit
            {
                return Err(ApplyError::SpentOutOfRange {
                    actor: self.id.clone(),
                    key: key.clone(),
                    spent,
                    limit,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_maps_default_to_empty() {
        let entity: Entity = serde_json::from_str(r#"{"id": "goblin", "name": "Goblin"}"#).unwrap();
        assert!(entity.stats.is_empty());
        assert!(entity.conditions.is_empty());
        assert_eq!(entity.size(), "");
    }

    #[test]
    fn test_remaining_resource() {
        let entity = Entity::new("fighter", "Fighter")
            .with_resource("hp", 30)
            .with_spent("hp", 12);
        assert_eq!(entity.remaining("hp"), 18);
        assert_eq!(entity.remaining("actions"), 0);
    }

    #[test]
    fn test_condition_prefix_lookup() {
        let mut entity = Entity::new("goblin", "Goblin");
        entity.conditions = vec!["prone".into(), "grappledby:fighter".into()];
        assert_eq!(entity.condition_with_prefix("grappledby:"), Some("grappledby:fighter"));
        assert_eq!(entity.condition_with_prefix("restrained"), None);
    }

    #[test]
    fn test_section_parsing() {
        assert_eq!("Spent".parse::<Section>().unwrap(), Section::Spent);
        assert!(Section::Inventory.is_numeric());
        assert!(!Section::Statuses.is_numeric());
        assert!("hitpoints".parse::<Section>().is_err());
    }
}
