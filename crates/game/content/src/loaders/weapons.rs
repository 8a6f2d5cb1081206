//! Weapon table loader.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use game_core::Value;

use crate::loaders::{LoadResult, read_file};

/// Loader for `weapons.yaml`: a map of weapon name to attack fields
/// (`dice`, `type`, `bonus`, `recharge`).
pub struct WeaponLoader;

impl WeaponLoader {
    /// A missing file yields an empty table. Names are lower-cased.
    pub fn load(path: &Path) -> LoadResult<BTreeMap<String, Value>> {
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("invalid weapon table {}", path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<BTreeMap<String, Value>> {
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let table: Option<BTreeMap<String, Value>> =
            serde_yaml::from_str(content).context("failed to parse weapon YAML")?;
        Ok(table
            .unwrap_or_default()
            .into_iter()
            .map(|(name, weapon)| (name.to_lowercase(), weapon))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;

    #[test]
    fn test_reference_weapons() {
        let table = WeaponLoader::parse(reference::WEAPONS).unwrap();
        let sword = &table["shortsword"];
        assert_eq!(sword.get("dice"), Some(&Value::from("1d6+3")));
        assert_eq!(sword.get("bonus"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_empty_file_is_empty_table() {
        assert!(WeaponLoader::parse("").unwrap().is_empty());
    }
}
