//! Campaign directory layout.

use std::path::{Path, PathBuf};

/// Paths inside one campaign directory.
///
/// ```text
/// <worlds_dir>/<world>/<campaign>/
/// ├── log.jsonl
/// ├── manifest.yaml
/// ├── weapons.yaml
/// ├── telegram.yaml
/// └── characters/
///     ├── fighter.yaml
///     └── goblin.yaml
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignLayout {
    root: PathBuf,
}

impl CampaignLayout {
    pub const LOG_FILE: &'static str = "log.jsonl";
    pub const MANIFEST_FILE: &'static str = "manifest.yaml";
    pub const WEAPONS_FILE: &'static str = "weapons.yaml";
    pub const BRIDGE_FILE: &'static str = "telegram.yaml";
    pub const CHARACTERS_DIR: &'static str = "characters";

    pub fn new(worlds_dir: impl AsRef<Path>, world: &str, campaign: &str) -> Self {
        Self {
            root: worlds_dir.as_ref().join(world).join(campaign),
        }
    }

    /// Uses `root` as the campaign directory itself.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(Self::LOG_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(Self::MANIFEST_FILE)
    }

    pub fn weapons_path(&self) -> PathBuf {
        self.root.join(Self::WEAPONS_FILE)
    }

    /// Optional chat bridge configuration; no loader reads it yet.
    pub fn bridge_config_path(&self) -> PathBuf {
        self.root.join(Self::BRIDGE_FILE)
    }

    pub fn characters_dir(&self) -> PathBuf {
        self.root.join(Self::CHARACTERS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = CampaignLayout::new("/srv/worlds", "faerun", "phandelver");
        assert_eq!(layout.root(), Path::new("/srv/worlds/faerun/phandelver"));
        assert_eq!(
            layout.log_path(),
            Path::new("/srv/worlds/faerun/phandelver/log.jsonl")
        );
        assert_eq!(
            layout.characters_dir(),
            Path::new("/srv/worlds/faerun/phandelver/characters")
        );
        assert_eq!(
            CampaignLayout::from_root("/tmp/c").manifest_path(),
            Path::new("/tmp/c/manifest.yaml")
        );
    }
}
