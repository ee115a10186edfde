// src/plugin/sink.rs

use tracing::{debug, info};

/// Destination for relayed plugin output.
///
/// Implementations only receive the machine name and the raw line; any
/// formatting is theirs.
pub trait LogSink: Send + Sync {
    /// A line the plugin wrote to stdout after the handshake.
    fn info(&self, machine: &str, line: &str);

    /// A line the plugin wrote to stderr.
    fn debug(&self, machine: &str, line: &str);
}

/// Default sink: forwards to `tracing` as `(<machine>) <line>` at INFO and
/// `(<machine>) DBG | <line>` at DEBUG.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, machine: &str, line: &str) {
        info!(target: "localplugin::plugin", "({machine}) {line}");
    }

    fn debug(&self, machine: &str, line: &str) {
        debug!(target: "localplugin::plugin", "({machine}) DBG | {line}");
    }
}
