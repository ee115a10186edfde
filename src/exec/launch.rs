// src/exec/launch.rs

//! Explicit launch description for a plugin child process.
//!
//! Everything the child needs (arguments, the plugin-mode environment
//! overlay, an optional uid/gid) travels in a [`LaunchSpec`] value and is
//! applied to the spawned command only. The supervising process's own
//! environment is never modified, so several plugins may be started
//! concurrently.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;

use crate::errors::{PluginError, Result};
use crate::resolve::ResolvedDriver;

/// Environment variable telling the child it runs under a supervisor.
pub const PLUGIN_ENV_KEY: &str = "MACHINE_PLUGIN_TOKEN";
/// Fixed value of [`PLUGIN_ENV_KEY`].
pub const PLUGIN_ENV_VAL: &str = "42";
/// Environment variable carrying the driver name the child should serve.
pub const PLUGIN_ENV_DRIVER_NAME: &str = "MACHINE_PLUGIN_DRIVER_NAME";
/// User id the child should run as (requires [`PLUGIN_GID`] too).
pub const PLUGIN_UID: &str = "MACHINE_PLUGIN_UID";
/// Group id the child should run as (requires [`PLUGIN_UID`] too).
pub const PLUGIN_GID: &str = "MACHINE_PLUGIN_GID";

/// Effective OS identity for the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    /// Read the identity override from the process environment.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the identity override through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. Both variables must be present for an
    /// override to apply; setting only one of them is rejected rather than
    /// half-applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uid = lookup(PLUGIN_UID).filter(|v| !v.is_empty());
        let gid = lookup(PLUGIN_GID).filter(|v| !v.is_empty());

        match (uid, gid) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(PluginError::PartialIdentity {
                present: PLUGIN_UID,
                missing: PLUGIN_GID,
            }),
            (None, Some(_)) => Err(PluginError::PartialIdentity {
                present: PLUGIN_GID,
                missing: PLUGIN_UID,
            }),
            (Some(uid), Some(gid)) => Ok(Some(Self {
                uid: parse_id(PLUGIN_UID, &uid)?,
                gid: parse_id(PLUGIN_GID, &gid)?,
            })),
        }
    }
}

fn parse_id(var: &'static str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|source| PluginError::InvalidIdentity {
            var,
            value: value.to_string(),
            source,
        })
}

/// Everything needed to spawn one plugin child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments passed after the program path.
    pub args: Vec<OsString>,
    /// Variables added on top of the inherited environment.
    pub env: BTreeMap<OsString, OsString>,
    /// Optional uid/gid override.
    pub identity: Option<Identity>,
}

impl LaunchSpec {
    /// Bare spec: no arguments, the plugin-mode overlay, no identity change.
    pub fn new(program: impl Into<PathBuf>, driver_name: &str) -> Self {
        let mut env = BTreeMap::new();
        env.insert(OsString::from(PLUGIN_ENV_KEY), OsString::from(PLUGIN_ENV_VAL));
        env.insert(
            OsString::from(PLUGIN_ENV_DRIVER_NAME),
            OsString::from(driver_name),
        );

        Self {
            program: program.into(),
            args: Vec::new(),
            env,
            identity: None,
        }
    }

    /// The production spec for a resolved driver.
    ///
    /// The child receives this process's full argument vector verbatim
    /// (its `argv[1]` is our `argv[0]`) and is expected to pick out what it
    /// needs. The identity override comes from `MACHINE_PLUGIN_UID` and
    /// `MACHINE_PLUGIN_GID`.
    pub fn for_driver(driver: &ResolvedDriver) -> Result<Self> {
        Ok(Self::new(&driver.path, &driver.name)
            .with_args(std::env::args_os())
            .with_identity(Identity::from_env()?))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    /// Build the Tokio command. Stdio is left to the caller.
    pub fn to_command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);

        if let Some(identity) = self.identity {
            apply_identity(&mut cmd, identity)?;
        }

        Ok(cmd)
    }
}

#[cfg(unix)]
fn apply_identity(cmd: &mut Command, identity: Identity) -> Result<()> {
    cmd.uid(identity.uid).gid(identity.gid);
    Ok(())
}

#[cfg(not(unix))]
fn apply_identity(_cmd: &mut Command, _identity: Identity) -> Result<()> {
    Err(PluginError::IdentityUnsupported)
}
