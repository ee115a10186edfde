// src/plugin/supervisor.rs

//! Plugin lifecycle: start, address handshake, output relay, shutdown.
//!
//! ```text
//! NotStarted -> HandshakePending -> Serving -> Closed
//!      \               \
//!       `---------------`--------------------> Closed
//! ```
//!
//! [`Plugin::serve`] drives the whole lifecycle and only returns once the
//! plugin is `Closed`. [`Plugin::address`] and [`Plugin::close`] may be
//! called concurrently from other tasks while `serve` runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{PluginError, Result};
use crate::exec::{LocalBinaryExecutor, PluginExecutor, PluginStreams, attach_stream};
use crate::resolve::{DriverResolver, ResolvedDriver};

use super::address::{AddressSlot, DEFAULT_TIMEOUT};
use super::sink::{LogSink, TracingSink};

/// Lifecycle state of a [`Plugin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    NotStarted,
    HandshakePending,
    Serving,
    Closed,
}

/// Supervises one driver plugin process.
///
/// Share it behind an `Arc` to call `address`/`close` while `serve` runs.
pub struct Plugin<E: PluginExecutor> {
    machine_name: String,
    driver_name: String,
    executor: Mutex<E>,
    address: AddressSlot,
    state: watch::Sender<PluginState>,
    stop: CancellationToken,
    timeout: Duration,
    sink: Arc<dyn LogSink>,
}

impl<E: PluginExecutor> std::fmt::Debug for Plugin<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("machine_name", &self.machine_name)
            .field("driver_name", &self.driver_name)
            .field("state", &self.state())
            .field("address", &self.address.get())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Plugin<LocalBinaryExecutor> {
    /// Plugin for an already resolved driver binary.
    pub fn from_resolved(driver: &ResolvedDriver, machine_name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(machine_name, LocalBinaryExecutor::new(driver)?))
    }

    /// Resolve `driver_name` and build a plugin for it.
    ///
    /// Fails with `BinaryNotFound` before anything is spawned.
    pub fn for_driver<R>(
        resolver: &R,
        driver_name: &str,
        machine_name: impl Into<String>,
    ) -> Result<Self>
    where
        R: DriverResolver + ?Sized,
    {
        let driver = resolver.resolve(driver_name)?;
        Self::from_resolved(&driver, machine_name)
    }
}

impl<E: PluginExecutor> Plugin<E> {
    pub fn new(machine_name: impl Into<String>, executor: E) -> Self {
        let (state, _rx) = watch::channel(PluginState::NotStarted);
        Self {
            machine_name: machine_name.into(),
            driver_name: executor.driver_name().to_string(),
            executor: Mutex::new(executor),
            address: AddressSlot::new(),
            state,
            stop: CancellationToken::new(),
            timeout: DEFAULT_TIMEOUT,
            sink: Arc::new(TracingSink),
        }
    }

    /// Address discovery timeout. Zero means "use the default" (10s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> PluginState {
        *self.state.borrow()
    }

    /// The address, if the handshake has completed. Never waits.
    pub fn cached_address(&self) -> Option<String> {
        self.address.get()
    }

    /// Wait up to the configured timeout for the plugin's address.
    ///
    /// Once known, the address is returned immediately on every call. A
    /// timeout does not affect `serve`; call again to keep waiting.
    pub async fn address(&self) -> Result<String> {
        if let Some(address) = self.address.get() {
            return Ok(address);
        }

        let address = self.address.wait(self.timeout).await?;
        debug!(
            machine = %self.machine_name,
            address = %address,
            "plugin server listening at address"
        );
        Ok(address)
    }

    /// Run the plugin until it is stopped.
    ///
    /// Starts the executor, reads the address handshake, then relays output
    /// to the log sink until [`close`](Self::close) or
    /// [`request_stop`](Self::request_stop) is called. Returns the error from
    /// waiting on the child, if any.
    ///
    /// Dropping the returned future early still leaves the plugin `Closed`,
    /// so `close` never hangs on an abandoned `serve`. A child it had started
    /// is killed once the plugin itself is dropped.
    pub async fn serve(&self) -> Result<()> {
        let mut begun = false;
        let stop_requested = self.stop.is_cancelled();
        self.state.send_if_modified(|state| {
            if *state != PluginState::NotStarted {
                return false;
            }
            *state = if stop_requested {
                PluginState::Closed
            } else {
                PluginState::HandshakePending
            };
            begun = true;
            true
        });

        if !begun {
            return Err(PluginError::AlreadyStarted);
        }
        if stop_requested {
            debug!(
                machine = %self.machine_name,
                "stop requested before serve; not starting plugin"
            );
            return Ok(());
        }

        // Marks the plugin `Closed` however this future ends, including when
        // the caller drops it mid-flight.
        let _closed = ClosedOnDrop(&self.state);

        let result = self.exec_server().await;
        if let Err(e) = &result {
            warn!(
                machine = %self.machine_name,
                driver = %self.driver_name,
                error = %e,
                "plugin server stopped with error"
            );
        }
        result
    }

    /// Ask `serve` to stop without waiting for it.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Stop the plugin and wait until `serve` has returned.
    ///
    /// Idempotent. On a plugin that was never served this just marks it
    /// closed; a later `serve` then fails with `AlreadyStarted`.
    pub async fn close(&self) {
        self.stop.cancel();
        self.state.send_if_modified(|state| {
            if *state != PluginState::NotStarted {
                return false;
            }
            *state = PluginState::Closed;
            true
        });

        let mut rx = self.state.subscribe();
        if rx.wait_for(|s| *s == PluginState::Closed).await.is_err() {
            debug!(machine = %self.machine_name, "plugin state channel closed while closing");
        }
    }

    async fn exec_server(&self) -> Result<()> {
        let mut executor = self.executor.lock().await;
        let PluginStreams { mut stdout, stderr } = executor.start()?;

        // Scan just one line to get the address.
        let first = tokio::select! {
            line = stdout.next_line() => line,
            () = self.stop.cancelled() => {
                info!(
                    machine = %self.machine_name,
                    driver = %self.driver_name,
                    "stop requested during handshake; terminating plugin"
                );
                return executor.terminate().await;
            }
        };

        let address = match handshake_address(first) {
            Ok(address) => address,
            Err(reason) => {
                if let Err(e) = executor.terminate().await {
                    warn!(
                        driver = %self.driver_name,
                        error = %e,
                        "failed to terminate plugin after handshake failure"
                    );
                }
                return Err(PluginError::AddressHandshake {
                    driver: self.driver_name.clone(),
                    reason,
                });
            }
        };

        self.address.publish(address.clone());
        self.state.send_replace(PluginState::Serving);
        info!(
            machine = %self.machine_name,
            driver = %self.driver_name,
            address = %address,
            "plugin handshake complete"
        );

        let mut out_rx = attach_stream(stdout, "stdout");
        let mut err_rx = attach_stream(stderr, "stderr");
        self.relay(&mut out_rx, &mut err_rx).await;

        // Relays keep draining (and discarding) once their receivers go.
        drop(out_rx);
        drop(err_rx);

        debug!(machine = %self.machine_name, "waiting for plugin process to exit");
        executor.close().await
    }

    async fn relay(
        &self,
        out_rx: &mut mpsc::Receiver<String>,
        err_rx: &mut mpsc::Receiver<String>,
    ) {
        let machine = self.machine_name.as_str();
        let mut out_open = true;
        let mut err_open = true;

        loop {
            tokio::select! {
                line = out_rx.recv(), if out_open => match line {
                    Some(line) => self.sink.info(machine, &line),
                    None => {
                        debug!(machine, "plugin stdout closed");
                        out_open = false;
                    }
                },
                line = err_rx.recv(), if err_open => match line {
                    Some(line) => self.sink.debug(machine, &line),
                    None => {
                        debug!(machine, "plugin stderr closed");
                        err_open = false;
                    }
                },
                () = self.stop.cancelled() => break,
            }
        }

        // Flush whatever the relays already handed over.
        while let Ok(line) = out_rx.try_recv() {
            self.sink.info(machine, &line);
        }
        while let Ok(line) = err_rx.try_recv() {
            self.sink.debug(machine, &line);
        }
    }
}

struct ClosedOnDrop<'a>(&'a watch::Sender<PluginState>);

impl Drop for ClosedOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(PluginState::Closed);
    }
}

/// Interpret the first stdout line as the plugin's address.
fn handshake_address(
    first: std::io::Result<Option<String>>,
) -> std::result::Result<String, String> {
    match first {
        Ok(Some(line)) => {
            let address = line.trim();
            if address.is_empty() {
                Err("plugin printed an empty address line".to_string())
            } else {
                Ok(address.to_string())
            }
        }
        Ok(None) => Err("plugin closed stdout before printing its address".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_line_is_trimmed() {
        assert_eq!(
            handshake_address(Ok(Some("  127.0.0.1:38241 \t".to_string()))),
            Ok("127.0.0.1:38241".to_string())
        );
    }

    #[test]
    fn missing_or_blank_handshake_is_rejected() {
        assert!(handshake_address(Ok(None)).is_err());
        assert!(handshake_address(Ok(Some("   ".to_string()))).is_err());
        assert!(
            handshake_address(Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8"
            )))
            .is_err()
        );
    }
}
