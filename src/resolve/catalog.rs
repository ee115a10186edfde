// src/resolve/catalog.rs

use std::collections::BTreeSet;

/// Drivers built into the host binary rather than shipped separately.
pub const CORE_DRIVERS: &[&str] = &[
    "amazonec2",
    "azure",
    "digitalocean",
    "exoscale",
    "generic",
    "google",
    "hyperv",
    "none",
    "openstack",
    "rackspace",
    "softlayer",
    "virtualbox",
    "vmwarefusion",
    "vmwarevcloudair",
    "vmwarevsphere",
    "pod",
    "noop",
];

/// Immutable set of core driver names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCatalog {
    names: BTreeSet<String>,
}

impl DriverCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The built-in catalog ([`CORE_DRIVERS`]).
    pub fn core() -> Self {
        Self::new(CORE_DRIVERS.iter().copied())
    }

    /// A catalog with no core drivers: every name needs its own binary.
    pub fn empty() -> Self {
        Self::new(std::iter::empty::<String>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for DriverCatalog {
    fn default() -> Self {
        Self::core()
    }
}
