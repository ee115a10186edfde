// src/resolve/mod.rs

//! Driver name resolution.
//!
//! The supervisor only ever sees a [`ResolvedDriver`]; how a name maps to an
//! executable is behind the [`DriverResolver`] trait. The production policy
//! lives in [`binary`], backed by the injected core-driver [`catalog`].

use std::path::PathBuf;

use crate::errors::Result;

pub mod binary;
pub mod catalog;

pub use binary::{BinaryResolver, DEFAULT_DRIVER_PREFIX, DEFAULT_HOST_BINARY};
pub use catalog::{CORE_DRIVERS, DriverCatalog};

/// A driver name together with the executable that implements it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    pub name: String,
    pub path: PathBuf,
}

/// Maps a driver name to a runnable executable.
pub trait DriverResolver {
    /// Resolve `driver_name`, or fail with `PluginError::BinaryNotFound`.
    fn resolve(&self, driver_name: &str) -> Result<ResolvedDriver>;
}
