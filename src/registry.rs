//! Endpoint name registry.
//!
//! Stands in for the pseudo-filesystem the endpoints are published in:
//! maps a file name to the endpoint behind it and its mode bits.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use spin::Mutex;

use crate::endpoint::EndpointId;

/// Error types for registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An endpoint with this name is already published.
    AlreadyRegistered(String),
    /// No endpoint with this name is published.
    NotRegistered(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyRegistered(name) => write!(f, "Endpoint already registered: {}", name),
            Self::NotRegistered(name) => write!(f, "Endpoint not registered: {}", name),
        }
    }
}

impl core::error::Error for Error {}

/// A published endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEndpoint {
    pub name: String,
    pub id: EndpointId,
    /// Permission bits, e.g. `0o666`.
    pub mode: u32,
}

impl RegisteredEndpoint {
    /// Whether a caller with `uid` may open the endpoint for reading and
    /// writing.
    pub fn permits(&self, uid: u32) -> bool {
        let other_rw = self.mode & 0o006 == 0o006;
        let owner_rw = self.mode & 0o600 == 0o600;
        other_rw || (uid == 0 && owner_rw)
    }
}

/// Name -> endpoint table.
pub struct EndpointRegistry {
    entries: Mutex<BTreeMap<String, RegisteredEndpoint>>,
}

impl EndpointRegistry {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Publish an endpoint under `name`.
    pub fn register(&self, name: &str, id: EndpointId, mode: u32) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            error!("Error while creating endpoint '{}': name taken", name);
            return Err(Error::AlreadyRegistered(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            RegisteredEndpoint {
                name: name.to_string(),
                id,
                mode,
            },
        );
        debug!("Endpoint '{}' was created successfully", name);
        Ok(())
    }

    /// Remove the endpoint published under `name`.
    pub fn unregister(&self, name: &str) -> Result<RegisteredEndpoint, Error> {
        let removed = self
            .entries
            .lock()
            .remove(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;
        debug!("Endpoint '{}' was removed successfully", name);
        Ok(removed)
    }

    pub fn lookup(&self, name: &str) -> Option<RegisteredEndpoint> {
        self.entries.lock().get(name).cloned()
    }

    /// List all published endpoints, ordered by name.
    pub fn list(&self) -> Vec<RegisteredEndpoint> {
        self.entries.lock().values().cloned().collect()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
