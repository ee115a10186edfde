// src/lib.rs

//! Out-of-process driver plugins.
//!
//! A driver plugin is a separate executable. The supervisor launches it,
//! reads the first line it prints on stdout as the address it is serving
//! on, then relays every further stdout/stderr line to the log until asked
//! to stop.
//!
//! ```no_run
//! # async fn demo() -> localplugin::errors::Result<()> {
//! use std::sync::Arc;
//! use localplugin::plugin::Plugin;
//! use localplugin::resolve::BinaryResolver;
//!
//! let plugin = Arc::new(Plugin::for_driver(&BinaryResolver::default(), "kvm", "dev-1")?);
//! let server = {
//!     let plugin = Arc::clone(&plugin);
//!     tokio::spawn(async move { plugin.serve().await })
//! };
//! let address = plugin.address().await?;
//! // ... talk to the driver at `address` ...
//! plugin.close().await;
//! # let _ = (address, server);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plugin;
pub mod resolve;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_optional, parse_duration};
use crate::exec::{LaunchSpec, LocalBinaryExecutor};
use crate::plugin::Plugin;
use crate::resolve::{BinaryResolver, DriverResolver, ResolvedDriver};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - driver resolution
/// - the plugin supervisor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_optional(args.config.as_deref())?;

    let timeout = match args.timeout.as_deref() {
        Some(raw) => parse_duration(raw).map_err(|e| anyhow!("--timeout: {e}"))?,
        None => cfg.plugin.discovery_timeout,
    };

    let resolver = BinaryResolver::from_config(&cfg.resolver);
    let driver = resolver.resolve(&args.driver)?;
    let machine = args.machine.clone().unwrap_or_else(|| driver.name.clone());
    let executor = LocalBinaryExecutor::new(&driver)?;

    if args.dry_run {
        print_dry_run(&driver, executor.spec(), &machine, timeout);
        return Ok(());
    }

    let plugin = Arc::new(Plugin::new(machine, executor).with_timeout(timeout));
    let mut server = {
        let plugin = Arc::clone(&plugin);
        tokio::spawn(async move { plugin.serve().await })
    };

    // A plugin that dies before its handshake should not make us sit out
    // the whole discovery timeout.
    let address = tokio::select! {
        address = plugin.address() => address,
        joined = &mut server => {
            flatten_serve(joined)?;
            return Err(anyhow!("plugin exited before announcing its address"));
        }
    };

    let address = match address {
        Ok(address) => address,
        Err(e) => {
            plugin.close().await;
            flatten_serve(server.await)?;
            return Err(e.into());
        }
    };

    println!("{address}");

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl+C received; stopping plugin"),
                Err(e) => debug!(error = %e, "failed to listen for Ctrl+C; stopping plugin"),
            }
            plugin.close().await;
            flatten_serve(server.await)
        }
        joined = &mut server => flatten_serve(joined),
    }
}

fn flatten_serve(joined: std::result::Result<errors::Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result.map_err(Into::into),
        Err(e) => Err(anyhow!("plugin server task failed: {e}")),
    }
}

/// Dry-run output: where the driver resolved to and how it would be launched.
fn print_dry_run(driver: &ResolvedDriver, spec: &LaunchSpec, machine: &str, timeout: Duration) {
    println!("localplugin dry-run");
    println!("  driver  = {}", driver.name);
    println!("  binary  = {}", driver.path.display());
    println!("  machine = {machine}");
    println!("  discovery timeout = {timeout:?}");

    println!("  args ({}):", spec.args.len());
    for arg in spec.args.iter() {
        println!("    - {}", arg.to_string_lossy());
    }

    println!("  env overlay:");
    for (key, value) in spec.env.iter() {
        println!("    {}={}", key.to_string_lossy(), value.to_string_lossy());
    }

    if let Some(identity) = spec.identity {
        println!("  run as uid={} gid={}", identity.uid, identity.gid);
    }

    debug!("dry-run complete (no execution)");
}
