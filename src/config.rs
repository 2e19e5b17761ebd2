//! Service configuration.
//!
//! A [`ServiceConfig`] is built once and handed to
//! [`InspectService::start`](crate::service::InspectService::start). The
//! verbose switch is the only setting that can change at runtime.

use alloc::string::{String, ToString};
use core::sync::atomic::{AtomicBool, Ordering};

/// Default scratch capacity, also the minimum accepted read buffer.
pub const BUFFER_LENGTH: usize = 1024;

/// Default name of the memory-region endpoint.
pub const VM_AREA_FILENAME: &str = "inspect_vm_area";

/// Default name of the inode endpoint.
pub const INODE_FILENAME: &str = "inspect_inode";

/// Global verbose mode switch: log every served record
static VERBOSE_MODE: AtomicBool = AtomicBool::new(false);

/// Enable or disable verbose mode
pub fn set_verbose(enabled: bool) {
    VERBOSE_MODE.store(enabled, Ordering::SeqCst);
    log::info!(
        "inspect verbose mode: {}",
        if enabled { "enabled" } else { "disabled" }
    );
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE_MODE.load(Ordering::SeqCst)
}

/// What a read does when the slot was already drained and nothing new was
/// written since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatRead {
    /// Serialize the cached resource again.
    ServeCached,
    /// Fail with [`Error::DataUnavailable`](crate::Error::DataUnavailable).
    Reject,
}

/// Who may open the endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Any caller, mode 0666.
    World,
    /// Only uid 0, mode 0600.
    RootOnly,
}

impl AccessPolicy {
    /// File mode bits the endpoints are registered with.
    pub fn mode(&self) -> u32 {
        match self {
            Self::World => 0o666,
            Self::RootOnly => 0o600,
        }
    }
}

/// Configuration of an [`InspectService`](crate::service::InspectService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Scratch capacity per endpoint and the minimum read buffer size.
    pub buffer_capacity: usize,
    /// Behavior of a read with no intervening write.
    pub repeat_read: RepeatRead,
    /// Re-validate the cached resource before serializing it.
    pub stale_check: bool,
    /// Endpoint access policy.
    pub access: AccessPolicy,
    /// Name of the memory-region endpoint.
    pub vm_area_name: String,
    /// Name of the inode endpoint.
    pub inode_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: BUFFER_LENGTH,
            repeat_read: RepeatRead::ServeCached,
            stale_check: true,
            access: AccessPolicy::World,
            vm_area_name: VM_AREA_FILENAME.to_string(),
            inode_name: INODE_FILENAME.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_repeat_read(mut self, policy: RepeatRead) -> Self {
        self.repeat_read = policy;
        self
    }

    pub fn with_stale_check(mut self, enabled: bool) -> Self {
        self.stale_check = enabled;
        self
    }

    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub fn with_names(mut self, vm_area: &str, inode: &str) -> Self {
        self.vm_area_name = vm_area.to_string();
        self.inode_name = inode.to_string();
        self
    }
}
