// src/exec/executor.rs

//! Pluggable process executor abstraction.
//!
//! The supervisor talks to a [`PluginExecutor`] instead of a raw child
//! process. Production code uses [`LocalBinaryExecutor`]; tests can provide
//! an implementation backed by in-memory pipes.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::errors::{PluginError, Result};
use crate::resolve::ResolvedDriver;

use super::launch::LaunchSpec;
use super::stream::LineSource;

/// Boxed future returned by the async executor operations.
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Line sources for a freshly started plugin.
#[derive(Debug)]
pub struct PluginStreams {
    pub stdout: LineSource,
    pub stderr: LineSource,
}

/// Trait abstracting how a plugin process is run.
pub trait PluginExecutor: Send {
    /// Driver this executor runs; used for log fields and errors.
    fn driver_name(&self) -> &str;

    /// Launch the plugin and hand back its output streams.
    ///
    /// Must be called at most once.
    fn start(&mut self) -> Result<PluginStreams>;

    /// Wait for the plugin to exit.
    ///
    /// Only call this once nothing is reading the streams any more, or the
    /// caller no longer cares about further output.
    fn close(&mut self) -> ExecFuture<'_>;

    /// Kill the plugin (if still running) and reap it.
    fn terminate(&mut self) -> ExecFuture<'_>;
}

/// Runs a driver plugin binary as a local child process.
#[derive(Debug)]
pub struct LocalBinaryExecutor {
    driver_name: String,
    spec: LaunchSpec,
    child: Option<Child>,
}

impl LocalBinaryExecutor {
    /// Executor for a resolved driver, using the production launch spec.
    pub fn new(driver: &ResolvedDriver) -> Result<Self> {
        Ok(Self::with_spec(&driver.name, LaunchSpec::for_driver(driver)?))
    }

    /// Executor for an explicit launch spec.
    pub fn with_spec(driver_name: impl Into<String>, spec: LaunchSpec) -> Self {
        Self {
            driver_name: driver_name.into(),
            spec,
            child: None,
        }
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// OS pid of the running child, if any.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

impl PluginExecutor for LocalBinaryExecutor {
    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn start(&mut self) -> Result<PluginStreams> {
        if self.child.is_some() {
            return Err(PluginError::AlreadyStarted);
        }

        debug!(
            driver = %self.driver_name,
            program = %self.spec.program.display(),
            "launching plugin server"
        );

        let mut cmd = self.spec.to_command()?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| PluginError::ProcessStart {
            driver: self.driver_name.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| PluginError::PipeSetup {
            driver: self.driver_name.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| PluginError::PipeSetup {
            driver: self.driver_name.clone(),
            stream: "stderr",
        })?;

        info!(
            driver = %self.driver_name,
            pid = child.id(),
            "plugin process started"
        );
        self.child = Some(child);

        Ok(PluginStreams {
            stdout: LineSource::new(stdout),
            stderr: LineSource::new(stderr),
        })
    }

    fn close(&mut self) -> ExecFuture<'_> {
        Box::pin(async move {
            let driver = self.driver_name.clone();
            let child = self.child.as_mut().ok_or(PluginError::NotStarted)?;

            let status = child
                .wait()
                .await
                .map_err(|source| PluginError::ProcessWait {
                    driver: driver.clone(),
                    source,
                })?;

            info!(
                driver = %driver,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "plugin process exited"
            );

            if status.success() {
                Ok(())
            } else {
                Err(PluginError::ProcessExited { driver, status })
            }
        })
    }

    fn terminate(&mut self) -> ExecFuture<'_> {
        Box::pin(async move {
            let Some(child) = self.child.as_mut() else {
                return Ok(());
            };

            let wait_err = |source| PluginError::ProcessWait {
                driver: self.driver_name.clone(),
                source,
            };

            if child.try_wait().map_err(wait_err)?.is_some() {
                debug!(driver = %self.driver_name, "plugin already exited; nothing to terminate");
                return Ok(());
            }

            warn!(driver = %self.driver_name, "terminating plugin process");
            child.kill().await.map_err(wait_err)
        })
    }
}
