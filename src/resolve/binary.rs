// src/resolve/binary.rs

//! `PATH`-based driver binary lookup.
//!
//! - A name containing a directory component is used as-is; the driver
//!   name becomes its file name.
//! - A core driver runs from the host binary: the current executable when
//!   it *is* the host, otherwise `host_binary` looked up on `PATH`.
//! - Anything else needs its own `<driver_prefix><name>` binary on `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ResolverSection;
use crate::errors::{PluginError, Result};

use super::catalog::DriverCatalog;
use super::{DriverResolver, ResolvedDriver};

pub const DEFAULT_HOST_BINARY: &str = "rancher-machine";
pub const DEFAULT_DRIVER_PREFIX: &str = "docker-machine-driver-";

#[derive(Debug, Clone)]
pub struct BinaryResolver {
    catalog: DriverCatalog,
    host_binary: String,
    driver_prefix: String,
    current_binary_is_host: bool,
    search_path: Option<OsString>,
}

impl BinaryResolver {
    pub fn new(catalog: DriverCatalog) -> Self {
        Self {
            catalog,
            host_binary: DEFAULT_HOST_BINARY.to_string(),
            driver_prefix: DEFAULT_DRIVER_PREFIX.to_string(),
            current_binary_is_host: false,
            search_path: None,
        }
    }

    pub fn from_config(cfg: &ResolverSection) -> Self {
        Self::new(DriverCatalog::new(cfg.core_drivers.iter().cloned()))
            .with_host_binary(cfg.host_binary.clone())
            .with_driver_prefix(cfg.driver_prefix.clone())
            .current_binary_is_host(cfg.current_binary_is_host)
    }

    pub fn with_host_binary(mut self, host_binary: impl Into<String>) -> Self {
        self.host_binary = host_binary.into();
        self
    }

    pub fn with_driver_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.driver_prefix = prefix.into();
        self
    }

    /// Run core drivers from the current executable instead of `host_binary`.
    pub fn current_binary_is_host(mut self, yes: bool) -> Self {
        self.current_binary_is_host = yes;
        self
    }

    /// Search these directories instead of the `PATH` environment variable.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    pub fn catalog(&self) -> &DriverCatalog {
        &self.catalog
    }

    /// Driver name and the path that will be looked up for `driver_name`.
    pub fn candidate(&self, driver_name: &str) -> (String, PathBuf) {
        let path = Path::new(driver_name);
        let has_dir = path
            .parent()
            .is_some_and(|parent| !parent.as_os_str().is_empty());

        if has_dir {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return (name, path.to_path_buf());
        }

        (driver_name.to_string(), self.driver_path(driver_name))
    }

    fn driver_path(&self, driver_name: &str) -> PathBuf {
        if self.catalog.contains(driver_name) {
            if self.current_binary_is_host {
                match std::env::current_exe() {
                    Ok(exe) => return exe,
                    Err(e) => debug!(
                        error = %e,
                        "cannot determine current executable; falling back to host binary"
                    ),
                }
            }
            return PathBuf::from(&self.host_binary);
        }

        PathBuf::from(format!("{}{}", self.driver_prefix, driver_name))
    }

    fn lookup(&self, candidate: &Path) -> which::Result<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_default();
                which::which_in(candidate, Some(paths), cwd)
            }
            None => which::which(candidate),
        }
    }
}

impl Default for BinaryResolver {
    fn default() -> Self {
        Self::new(DriverCatalog::default())
    }
}

impl DriverResolver for BinaryResolver {
    fn resolve(&self, driver_name: &str) -> Result<ResolvedDriver> {
        let (name, candidate) = self.candidate(driver_name);

        match self.lookup(&candidate) {
            Ok(path) => {
                debug!(driver = %name, path = %path.display(), "found binary path");
                Ok(ResolvedDriver { name, path })
            }
            Err(e) => {
                debug!(
                    driver = %name,
                    candidate = %candidate.display(),
                    error = %e,
                    "driver binary lookup failed"
                );
                Err(PluginError::BinaryNotFound {
                    driver_name: name,
                    searched_path: candidate,
                })
            }
        }
    }
}
