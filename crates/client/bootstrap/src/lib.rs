//! Shared bootstrap utilities for client front-ends.
//!
//! Provides configuration loading and session assembly that can be reused
//! by the terminal client, chat bridges, or other front-end crates.
pub mod builder;
pub mod config;

pub use builder::SessionBootstrap;
pub use config::ClientConfig;
