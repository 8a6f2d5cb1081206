//! Reference campaign bundled with the crate.
//!
//! New campaigns are seeded from these files, and tests use them as a
//! known-good rule set.

pub const MANIFEST: &str = include_str!("../data/reference/manifest.yaml");

pub const WEAPONS: &str = include_str!("../data/reference/weapons.yaml");

/// `(file name, contents)` for every bundled character sheet.
pub const CHARACTERS: &[(&str, &str)] = &[
    (
        "fighter.yaml",
        include_str!("../data/reference/characters/fighter.yaml"),
    ),
    (
        "goblin.yaml",
        include_str!("../data/reference/characters/goblin.yaml"),
    ),
];
