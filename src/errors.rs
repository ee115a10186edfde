// src/errors.rs

//! Crate-wide error type and result alias.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(
        "Driver {driver_name:?} not found. Do you have the plugin binary {searched_path:?} accessible in your PATH?"
    )]
    BinaryNotFound {
        driver_name: String,
        searched_path: PathBuf,
    },

    #[error("error getting {stream} pipe for plugin '{driver}'")]
    PipeSetup {
        driver: String,
        stream: &'static str,
    },

    #[error("error starting plugin binary for driver '{driver}': {source}")]
    ProcessStart {
        driver: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {var}={value:?} as a numeric id: {source}")]
    InvalidIdentity {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{present} is set but {missing} is not; both must be set to change the plugin identity")]
    PartialIdentity {
        present: &'static str,
        missing: &'static str,
    },

    #[error("running a plugin under another user/group is not supported on this platform")]
    IdentityUnsupported,

    #[error("reading plugin address failed for driver '{driver}': {reason}")]
    AddressHandshake { driver: String, reason: String },

    #[error("plugin binary for driver '{driver}' exited unsuccessfully: {status}")]
    ProcessExited { driver: String, status: ExitStatus },

    #[error("error waiting for plugin binary of driver '{driver}' to close: {source}")]
    ProcessWait {
        driver: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to dial the plugin server in {timeout:?}")]
    AddressDiscoveryTimeout { timeout: Duration },

    #[error("plugin has already been started")]
    AlreadyStarted,

    #[error("plugin has not been started")]
    NotStarted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PluginError>;
