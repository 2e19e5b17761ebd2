//! Kernel state capability.
//!
//! The endpoints never walk the process table or the dentry cache
//! themselves. They ask a [`KernelState`] implementation, which returns a
//! snapshot of the resource together with a key and a generation that can
//! later be checked to detect that the resource changed or went away.

use alloc::string::String;

/// Process identifier accepted by the memory-region endpoint.
pub type Pid = u32;

/// First memory mapping of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMemoryRegion {
    /// First address of the mapping.
    pub start: u64,
    /// First address past the mapping.
    pub end: u64,
    /// `VM_*` flag bits.
    pub flags: u64,
    /// A mapping precedes this one in the address space.
    pub has_prev: bool,
    /// A mapping follows this one in the address space.
    pub has_next: bool,
    /// Inode of the backing file, `None` for anonymous mappings.
    pub backing_inode: Option<u64>,
}

/// Inode metadata reachable from a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInodeInfo {
    /// Inode number.
    pub number: u64,
    /// Byte count reported by the filesystem.
    pub size_hint: u64,
    /// Last access, seconds since the epoch.
    pub access_time: i64,
    /// Last content modification, seconds since the epoch.
    pub modify_time: i64,
    /// Last metadata change, seconds since the epoch.
    pub change_time: i64,
}

/// Identity of a resolved resource, used to re-validate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKey {
    /// The address space of a process.
    Process(Pid),
    /// An inode reached through `path`.
    Inode {
        path: String,
        device: u64,
        number: u64,
    },
}

/// A resolved resource with the evidence needed to re-validate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub key: ResourceKey,
    pub generation: u64,
}

impl<T> Resolved<T> {
    pub fn new(value: T, key: ResourceKey, generation: u64) -> Self {
        Self {
            value,
            key,
            generation,
        }
    }
}

/// Kernel lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// No live process has this identifier.
    NoSuchProcess,
    /// The process has no user address space or no mappings.
    NoAddressSpace,
    /// The process exists but its address space may not be inspected.
    AccessDenied,
    /// Path lookup failed with this errno.
    Path(i32),
}

impl core::fmt::Display for LookupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoSuchProcess => write!(f, "no such process"),
            Self::NoAddressSpace => write!(f, "process has no address space"),
            Self::AccessDenied => write!(f, "access to process denied"),
            Self::Path(errno) => write!(f, "path lookup failed with errno {}", errno),
        }
    }
}

impl core::error::Error for LookupError {}

/// Path lookup errno values.
pub mod path_errno {
    pub const ENOENT: i32 = 2;
    pub const EINVAL: i32 = 22;
    pub const ENAMETOOLONG: i32 = 36;
    pub const ELOOP: i32 = 40;
}

/// Live kernel state queried by the endpoints.
pub trait KernelState: Send + Sync {
    /// Snapshot of the first mapping in the address space of `pid`.
    fn find_process_first_mapping(
        &self,
        pid: Pid,
    ) -> Result<Resolved<ResolvedMemoryRegion>, LookupError>;

    /// Resolve `path`, following symbolic links, to its inode.
    fn resolve_path_inode(&self, path: &str) -> Result<Resolved<ResolvedInodeInfo>, LookupError>;

    /// Current generation of the resource named by `key`, or `None` if it no
    /// longer exists.
    fn generation(&self, key: &ResourceKey) -> Option<u64>;
}

impl<K: KernelState + ?Sized> KernelState for alloc::sync::Arc<K> {
    fn find_process_first_mapping(
        &self,
        pid: Pid,
    ) -> Result<Resolved<ResolvedMemoryRegion>, LookupError> {
        (**self).find_process_first_mapping(pid)
    }

    fn resolve_path_inode(&self, path: &str) -> Result<Resolved<ResolvedInodeInfo>, LookupError> {
        (**self).resolve_path_inode(path)
    }

    fn generation(&self, key: &ResourceKey) -> Option<u64> {
        (**self).generation(key)
    }
}
