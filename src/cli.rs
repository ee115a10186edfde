// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Note that the plugin child receives this process's full argument vector,
//! flags included; driver binaries pick out what they need.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `localplugin`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "localplugin",
    version,
    about = "Launch a driver plugin binary, print the address it serves on, and relay its logs.",
    long_about = None
)]
pub struct CliArgs {
    /// Driver to run: a bare driver name or a path to the plugin binary.
    #[arg(long, value_name = "NAME")]
    pub driver: String,

    /// Machine name used to tag relayed log lines.
    ///
    /// Defaults to the driver name.
    #[arg(long, value_name = "NAME")]
    pub machine: Option<String>,

    /// Optional config file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How long to wait for the plugin address, e.g. `10s`, `500ms`.
    ///
    /// Overrides `[plugin].discovery_timeout` from the config file.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOCALPLUGIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve the driver and print the launch plan without starting it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
