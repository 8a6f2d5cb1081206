//! Rule manifest loader.

use std::path::Path;

use anyhow::Context;
use game_core::Manifest;

use crate::loaders::{LoadResult, read_file};

/// Loader for `manifest.yaml`.
pub struct ManifestLoader;

impl ManifestLoader {
    /// Reads and validates a manifest file.
    ///
    /// Every formula is compiled up front: a syntax error fails the load,
    /// an unknown event name is logged as a warning.
    pub fn load(path: &Path) -> LoadResult<Manifest> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<Manifest> {
        let manifest = serde_yaml::from_str::<Manifest>(content)
            .context("failed to parse manifest YAML")?
            .normalized();

        for warning in manifest.lint()? {
            tracing::warn!(%warning, "manifest lint");
        }
        tracing::debug!(commands = manifest.commands.len(), "manifest loaded");
        Ok(manifest)
    }
}
