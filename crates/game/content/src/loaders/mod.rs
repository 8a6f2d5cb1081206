//! YAML loaders for campaign files.

pub mod campaign;
pub mod characters;
pub mod factory;
pub mod manifest;
pub mod weapons;

pub use campaign::CampaignData;
pub use characters::CharacterLoader;
pub use factory::ContentFactory;
pub use manifest::ManifestLoader;
pub use weapons::WeaponLoader;

use std::path::Path;

use anyhow::Context;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
