//! Introspection service context.
//!
//! [`InspectService`] owns both endpoints and the kernel state they query,
//! publishes the endpoints in an [`EndpointRegistry`] on start and removes
//! them when dropped.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use core::str::FromStr;

use crate::config::ServiceConfig;
use crate::endpoint::{Endpoint, EndpointId, Inode, VmArea};
use crate::error::{Error, Result};
use crate::kstate::KernelState;
use crate::record::{MAX_RECORD_LEN, ParseRecordError};
use crate::registry::{self, EndpointRegistry};
use crate::stats::StatsSnapshot;
use crate::user::{UserSink, UserSource};

/// Identity of the caller opening an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub uid: u32,
}

impl Credentials {
    pub const ROOT: Self = Self { uid: 0 };

    pub const fn user(uid: u32) -> Self {
        Self { uid }
    }
}

/// An open handle on one endpoint.
///
/// Tracks the read offset; once a record has been read through a handle,
/// further reads on it report end-of-data.
#[derive(Debug)]
pub struct OpenFile {
    id: EndpointId,
    name: String,
    offset: u64,
}

impl OpenFile {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Why the service could not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// The configured scratch buffer cannot hold a whole record.
    CapacityTooSmall { capacity: usize, required: usize },
    /// Publishing an endpoint failed.
    Registry(registry::Error),
}

impl From<registry::Error> for StartError {
    fn from(e: registry::Error) -> Self {
        Self::Registry(e)
    }
}

impl core::fmt::Display for StartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CapacityTooSmall { capacity, required } => write!(
                f,
                "Buffer capacity {} is below the record size {}",
                capacity, required
            ),
            Self::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl core::error::Error for StartError {}

/// The running introspection service.
pub struct InspectService<K: KernelState> {
    config: ServiceConfig,
    kernel: K,
    registry: Arc<EndpointRegistry>,
    vm_area: Endpoint<VmArea>,
    inode: Endpoint<Inode>,
}

impl<K: KernelState> InspectService<K> {
    /// Build both endpoints and publish them in `registry`.
    pub fn start(
        config: ServiceConfig,
        kernel: K,
        registry: Arc<EndpointRegistry>,
    ) -> core::result::Result<Self, StartError> {
        info!("Initializing inspect service...");

        if config.buffer_capacity < MAX_RECORD_LEN {
            error!(
                "Buffer capacity {} cannot hold a record ({} bytes)",
                config.buffer_capacity, MAX_RECORD_LEN
            );
            return Err(StartError::CapacityTooSmall {
                capacity: config.buffer_capacity,
                required: MAX_RECORD_LEN,
            });
        }

        let mode = config.access.mode();
        registry.register(&config.vm_area_name, EndpointId::VmArea, mode)?;
        if let Err(e) = registry.register(&config.inode_name, EndpointId::Inode, mode) {
            let _ = registry.unregister(&config.vm_area_name);
            return Err(e.into());
        }

        let vm_area = Endpoint::new(&config.vm_area_name, &config);
        let inode = Endpoint::new(&config.inode_name, &config);

        info!(
            "  - endpoints: {}, {} (mode {:o})",
            config.vm_area_name, config.inode_name, mode
        );
        info!(
            "  - buffer: {} bytes, repeat read: {:?}, stale check: {}",
            config.buffer_capacity, config.repeat_read, config.stale_check
        );
        info!("inspect service initialized successfully");

        Ok(Self {
            config,
            kernel,
            registry,
            vm_area,
            inode,
        })
    }

    /// Unpublish the endpoints and tear the service down.
    pub fn stop(self) {
        drop(self);
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn vm_area(&self) -> &Endpoint<VmArea> {
        &self.vm_area
    }

    pub fn inode(&self) -> &Endpoint<Inode> {
        &self.inode
    }

    fn endpoint_name(&self, id: EndpointId) -> &str {
        match id {
            EndpointId::VmArea => self.vm_area.name(),
            EndpointId::Inode => self.inode.name(),
        }
    }

    /// Open the endpoint published as `name`.
    pub fn open(&self, name: &str, credentials: Credentials) -> Result<OpenFile> {
        let entry = self
            .registry
            .lookup(name)
            .filter(|entry| self.endpoint_name(entry.id) == name)
            .ok_or_else(|| {
                warn!("Error: no endpoint named '{}'", name);
                Error::NotFound
            })?;

        if !entry.permits(credentials.uid) {
            warn!(
                "Error: uid {} may not open '{}' (mode {:o})",
                credentials.uid, name, entry.mode
            );
            return Err(Error::PermissionDenied);
        }

        Ok(OpenFile {
            id: entry.id,
            name: name.to_string(),
            offset: 0,
        })
    }

    /// Write `src` to the endpoint behind `file`.
    pub fn write<S: UserSource + ?Sized>(&self, file: &mut OpenFile, src: &S) -> Result<usize> {
        match file.id {
            EndpointId::VmArea => self.vm_area.write(&self.kernel, src),
            EndpointId::Inode => self.inode.write(&self.kernel, src),
        }
    }

    /// Read the endpoint behind `file` into `dst`.
    pub fn read<D: UserSink + ?Sized>(&self, file: &mut OpenFile, dst: &mut D) -> Result<usize> {
        match file.id {
            EndpointId::VmArea => self.vm_area.read(&self.kernel, &mut file.offset, dst),
            EndpointId::Inode => self.inode.read(&self.kernel, &mut file.offset, dst),
        }
    }

    /// Write `payload` to the endpoint published as `name` and parse the
    /// record a fresh handle then reads back.
    ///
    /// A write refused with [`Error::Busy`] is re-issued up to `retries`
    /// more times before giving up with `Busy`. Other write or read errors
    /// are returned as they are. A record that does not parse as `R` (for
    /// example an inode record requested as a memory region) is
    /// `InvalidArgument`.
    pub fn query<R>(
        &self,
        name: &str,
        credentials: Credentials,
        payload: &str,
        retries: usize,
    ) -> Result<R>
    where
        R: FromStr<Err = ParseRecordError>,
    {
        let mut file = self.open(name, credentials)?;
        let mut attempt = 0;
        loop {
            match self.write(&mut file, payload) {
                Ok(_) => break,
                Err(Error::Busy) if attempt < retries => {
                    attempt += 1;
                    debug!("'{}' busy, retrying ({}/{})", name, attempt, retries);
                    core::hint::spin_loop();
                }
                Err(Error::Busy) => {
                    warn!("'{}' still busy after {} retries", name, retries);
                    return Err(Error::Busy);
                }
                Err(e) => return Err(e),
            }
        }

        let mut file = self.open(name, credentials)?;
        let mut buf = vec![0u8; self.config.buffer_capacity];
        let len = self.read(&mut file, &mut buf[..])?;
        core::str::from_utf8(&buf[..len])
            .map_err(|_| ParseRecordError::Malformed)
            .and_then(str::parse)
            .map_err(|e| {
                warn!("Error: record from '{}': {}", name, e);
                Error::InvalidArgument
            })
    }

    /// Counters of one endpoint.
    pub fn stats(&self, id: EndpointId) -> StatsSnapshot {
        match id {
            EndpointId::VmArea => self.vm_area.stats(),
            EndpointId::Inode => self.inode.stats(),
        }
    }
}

impl<K: KernelState> Drop for InspectService<K> {
    fn drop(&mut self) {
        for name in [&self.config.vm_area_name, &self.config.inode_name] {
            if let Err(e) = self.registry.unregister(name) {
                warn!("{}", e);
            }
        }
        info!("inspect service stopped");
    }
}
