// src/config/mod.rs

//! Configuration loading and validation for localplugin.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a `ConfigFile` (`validate.rs`).
//! - Parse human duration strings such as `"10s"` (`duration.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_optional};
pub use model::{ConfigFile, PluginSection, RawConfigFile, RawPluginSection, ResolverSection};
