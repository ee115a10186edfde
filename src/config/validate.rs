// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, PluginSection, RawConfigFile, ResolverSection};
use crate::errors::{PluginError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PluginError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let plugin = validate_plugin_section(&raw)?;
        validate_resolver_section(&raw.resolver)?;
        Ok(ConfigFile::new_unchecked(plugin, raw.resolver))
    }
}

fn validate_plugin_section(cfg: &RawConfigFile) -> Result<PluginSection> {
    let timeout = parse_duration(&cfg.plugin.discovery_timeout).map_err(|e| {
        PluginError::ConfigError(format!("[plugin].discovery_timeout: {e}"))
    })?;

    if timeout.is_zero() {
        return Err(PluginError::ConfigError(
            "[plugin].discovery_timeout must be greater than zero".to_string(),
        ));
    }

    Ok(PluginSection {
        discovery_timeout: timeout,
    })
}

fn validate_resolver_section(cfg: &ResolverSection) -> Result<()> {
    if cfg.host_binary.trim().is_empty() {
        return Err(PluginError::ConfigError(
            "[resolver].host_binary must not be empty".to_string(),
        ));
    }

    if cfg.driver_prefix.trim().is_empty() {
        return Err(PluginError::ConfigError(
            "[resolver].driver_prefix must not be empty".to_string(),
        ));
    }

    for name in cfg.core_drivers.iter() {
        if name.trim().is_empty() {
            return Err(PluginError::ConfigError(
                "[resolver].core_drivers must not contain empty names".to_string(),
            ));
        }
        if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
            return Err(PluginError::ConfigError(format!(
                "[resolver].core_drivers entry '{}' must be a bare name, not a path",
                name
            )));
        }
    }

    Ok(())
}
