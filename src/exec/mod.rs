// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running driver plugin binaries,
//! using `tokio::process::Command`, and exposing their output as line
//! sources.
//!
//! - [`launch`] builds the explicit [`LaunchSpec`] (arguments, plugin-mode
//!   environment overlay, optional uid/gid) applied to the spawn only.
//! - [`executor`] provides the `PluginExecutor` trait and the concrete
//!   `LocalBinaryExecutor` used in production, which tests can replace with
//!   a fake implementation.
//! - [`stream`] contains the line sources and the relay tasks draining them.

pub mod executor;
pub mod launch;
pub mod stream;

pub use executor::{ExecFuture, LocalBinaryExecutor, PluginExecutor, PluginStreams};
pub use launch::{Identity, LaunchSpec};
pub use stream::{LineSource, attach_stream};
