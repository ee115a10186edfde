// src/plugin/mod.rs

//! Driver plugin supervision.
//!
//! - [`supervisor`] owns the lifecycle: executor start, the one-line address
//!   handshake, the stdout/stderr relay loop and shutdown.
//! - [`address`] holds the single-assignment address slot that
//!   `Plugin::address` waits on.
//! - [`sink`] is where relayed output lines go (`tracing` by default).

pub mod address;
pub mod sink;
pub mod supervisor;

pub use address::{AddressSlot, DEFAULT_TIMEOUT};
pub use sink::{LogSink, TracingSink};
pub use supervisor::{Plugin, PluginState};
