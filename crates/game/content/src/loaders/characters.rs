//! Character sheet loader.
//!
//! Each `characters/*.yaml` file holds one entity or a list of entities.
//! Missing maps default to empty.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, bail};
use game_core::Entity;
use serde::Deserialize;

use crate::loaders::{LoadResult, read_file};

#[derive(Deserialize)]
#[serde(untagged)]
enum CharacterFile {
    One(Entity),
    Many(Vec<Entity>),
}

/// Loader for the `characters/` directory.
pub struct CharacterLoader;

impl CharacterLoader {
    /// Loads every `.yaml`/`.yml` file in `dir`, in file-name order.
    ///
    /// A missing directory yields no entities. Duplicate or empty ids fail
    /// the load.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<Entity>> {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no characters directory");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            if is_yaml && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entities = Vec::new();
        let mut seen = BTreeSet::new();
        for path in paths {
            for entity in Self::load_file(&path)? {
                if entity.id.is_empty() {
                    bail!("{}: entity without an id", path.display());
                }
                if !seen.insert(entity.id.clone()) {
                    bail!("{}: duplicate entity id '{}'", path.display(), entity.id);
                }
                entities.push(entity);
            }
        }
        tracing::debug!(count = entities.len(), "characters loaded");
        Ok(entities)
    }

    pub fn load_file(path: &Path) -> LoadResult<Vec<Entity>> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("invalid character file {}", path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<Vec<Entity>> {
        let file = serde_yaml::from_str::<CharacterFile>(content)
            .context("failed to parse character YAML")?;
        let entities = match file {
            CharacterFile::One(entity) => vec![entity],
            CharacterFile::Many(entities) => entities,
        };
        for entity in &entities {
            entity
                .check_spent()
                .with_context(|| format!("invalid spent budget on '{}'", entity.id))?;
        }
        Ok(entities)
    }
}
