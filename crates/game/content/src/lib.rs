//! Campaign content: the rule manifest, character sheets and weapon tables.
//!
//! This crate knows the on-disk campaign layout and provides YAML loaders
//! that turn those files into game-core types:
//! - Rule manifest (`manifest.yaml`)
//! - Characters and monsters (`characters/*.yaml`)
//! - Weapon table (`weapons.yaml`)
//!
//! Content seeds the genesis state and answers [`game_core::DataLoader`]
//! lookups; it never appears in the event log.

pub mod layout;
pub mod reference;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use layout::CampaignLayout;

#[cfg(feature = "loaders")]
pub use loaders::{
    CampaignData, CharacterLoader, ContentFactory, LoadResult, ManifestLoader, WeaponLoader,
};
