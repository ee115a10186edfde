// src/plugin/address.rs

//! Single-assignment slot holding the address a plugin announced.

use std::time::Duration;

use tokio::sync::watch;

use crate::errors::{PluginError, Result};

/// How long `address()` waits for the handshake unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Written at most once, read any number of times by any number of tasks.
#[derive(Debug)]
pub struct AddressSlot {
    tx: watch::Sender<Option<String>>,
}

impl AddressSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Store the address. Returns `false` (and keeps the first value) if one
    /// was already published.
    pub fn publish(&self, address: String) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(address);
            true
        })
    }

    /// The published address, without waiting.
    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Wait up to `timeout` for the address to be published.
    ///
    /// A timeout leaves the slot untouched; a later call can still succeed.
    pub async fn wait(&self, timeout: Duration) -> Result<String> {
        if let Some(address) = self.get() {
            return Ok(address);
        }

        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(published)) => (*published)
                .clone()
                .ok_or(PluginError::AddressDiscoveryTimeout { timeout }),
            Ok(Err(_)) | Err(_) => Err(PluginError::AddressDiscoveryTimeout { timeout }),
        }
    }
}

impl Default for AddressSlot {
    fn default() -> Self {
        Self::new()
    }
}
