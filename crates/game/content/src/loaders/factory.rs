//! Content factory for one campaign directory.

use std::path::Path;

use anyhow::Context;
use game_core::Manifest;

use crate::layout::CampaignLayout;
use crate::loaders::{CampaignData, CharacterLoader, LoadResult, ManifestLoader, WeaponLoader};
use crate::reference;

/// Loads everything a session needs from a [`CampaignLayout`].
#[derive(Clone, Debug)]
pub struct ContentFactory {
    layout: CampaignLayout,
}

impl ContentFactory {
    pub fn new(layout: CampaignLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CampaignLayout {
        &self.layout
    }

    /// Load the rule manifest from `manifest.yaml`.
    pub fn load_manifest(&self) -> LoadResult<Manifest> {
        ManifestLoader::load(&self.layout.manifest_path())
    }

    /// Load characters and the weapon table.
    pub fn load_data(&self) -> LoadResult<CampaignData> {
        let entities = CharacterLoader::load_dir(&self.layout.characters_dir())?;
        let weapons = WeaponLoader::load(&self.layout.weapons_path())?;
        tracing::info!(
            campaign = %self.layout.root().display(),
            entities = entities.len(),
            weapons = weapons.len(),
            "campaign content loaded"
        );
        Ok(CampaignData::new(entities, weapons))
    }

    /// Creates the campaign directory and writes the bundled reference
    /// files that are missing. Existing files are never touched.
    ///
    /// Returns `true` when a manifest was written.
    pub fn install_reference(&self) -> LoadResult<bool> {
        let characters = self.layout.characters_dir();
        std::fs::create_dir_all(&characters)
            .with_context(|| format!("failed to create {}", characters.display()))?;

        let wrote_manifest = write_if_missing(&self.layout.manifest_path(), reference::MANIFEST)?;
        write_if_missing(&self.layout.weapons_path(), reference::WEAPONS)?;
        if wrote_manifest {
            for (name, content) in reference::CHARACTERS {
                write_if_missing(&characters.join(name), content)?;
            }
            tracing::info!(
                campaign = %self.layout.root().display(),
                "installed reference campaign"
            );
        }
        Ok(wrote_manifest)
    }
}

fn write_if_missing(path: &Path, content: &str) -> LoadResult<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::DataLoader;

    #[test]
    fn test_install_then_load_reference_campaign() {
        let dir = tempfile::tempdir().unwrap();
        let factory = ContentFactory::new(CampaignLayout::new(dir.path(), "world", "campaign"));

        assert!(factory.install_reference().unwrap());
        assert!(!factory.install_reference().unwrap());

        let manifest = factory.load_manifest().unwrap();
        assert!(manifest.command("grapple").is_some());

        let data = factory.load_data().unwrap();
        assert_eq!(data.entity_count(), 2);
        assert_eq!(data.entity("goblin").unwrap().stats["dex"], 14);
        assert!(data.weapon("shortsword").is_some());
    }

    #[test]
    fn test_existing_manifest_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CampaignLayout::from_root(dir.path());
        std::fs::write(layout.manifest_path(), "commands: {}\n").unwrap();

        let factory = ContentFactory::new(layout);
        assert!(!factory.install_reference().unwrap());
        assert!(factory.load_manifest().unwrap().commands.is_empty());
        assert_eq!(factory.load_data().unwrap().entity_count(), 0);
    }
}
