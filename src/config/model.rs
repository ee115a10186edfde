// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::plugin::DEFAULT_TIMEOUT;
use crate::resolve::{CORE_DRIVERS, DEFAULT_DRIVER_PREFIX, DEFAULT_HOST_BINARY, DriverCatalog};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [plugin]
/// discovery_timeout = "10s"
///
/// [resolver]
/// core_drivers = ["generic", "none"]
/// host_binary = "rancher-machine"
/// driver_prefix = "docker-machine-driver-"
/// current_binary_is_host = false
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub plugin: RawPluginSection,

    #[serde(default)]
    pub resolver: ResolverSection,
}

/// `[plugin]` section as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPluginSection {
    /// How long `address()` waits for the handshake, e.g. `"10s"`, `"500ms"`.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout: String,
}

fn default_discovery_timeout() -> String {
    format!("{}s", DEFAULT_TIMEOUT.as_secs())
}

impl Default for RawPluginSection {
    fn default() -> Self {
        Self {
            discovery_timeout: default_discovery_timeout(),
        }
    }
}

/// `[resolver]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResolverSection {
    /// Drivers served by the host binary itself.
    #[serde(default = "default_core_drivers")]
    pub core_drivers: Vec<String>,

    /// Host binary looked up on `PATH` for core drivers.
    #[serde(default = "default_host_binary")]
    pub host_binary: String,

    /// Prefix of standalone driver binaries.
    #[serde(default = "default_driver_prefix")]
    pub driver_prefix: String,

    /// Run core drivers from the current executable.
    #[serde(default)]
    pub current_binary_is_host: bool,
}

fn default_core_drivers() -> Vec<String> {
    CORE_DRIVERS.iter().map(|s| s.to_string()).collect()
}

fn default_host_binary() -> String {
    DEFAULT_HOST_BINARY.to_string()
}

fn default_driver_prefix() -> String {
    DEFAULT_DRIVER_PREFIX.to_string()
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            core_drivers: default_core_drivers(),
            host_binary: default_host_binary(),
            driver_prefix: default_driver_prefix(),
            current_binary_is_host: false,
        }
    }
}

/// Validated `[plugin]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSection {
    pub discovery_timeout: Duration,
}

impl Default for PluginSection {
    fn default() -> Self {
        Self {
            discovery_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub plugin: PluginSection,
    pub resolver: ResolverSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(plugin: PluginSection, resolver: ResolverSection) -> Self {
        Self { plugin, resolver }
    }

    pub fn catalog(&self) -> DriverCatalog {
        DriverCatalog::new(self.resolver.core_drivers.iter().cloned())
    }
}
