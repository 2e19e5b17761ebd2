//! Resource resolution against the kernel state.

use crate::error::{Error, Result};
use crate::kstate::{
    KernelState, LookupError, Pid, Resolved, ResolvedInodeInfo, ResolvedMemoryRegion,
};

/// Resolve the first memory mapping of `pid`.
///
/// Only the first mapping in the process's list is reported; there is no
/// per-region selection.
pub fn resolve_memory_region<K: KernelState + ?Sized>(
    kernel: &K,
    pid: Pid,
) -> Result<Resolved<ResolvedMemoryRegion>> {
    match kernel.find_process_first_mapping(pid) {
        Ok(resolved) => {
            debug!(
                "Found first mapping of pid {}: {:#x}-{:#x}",
                pid, resolved.value.start, resolved.value.end
            );
            Ok(resolved)
        }
        Err(LookupError::NoSuchProcess) => {
            warn!("Error: process {} not found", pid);
            Err(Error::NotFound)
        }
        Err(LookupError::AccessDenied) => {
            warn!("Error: may not inspect process {}", pid);
            Err(Error::PermissionDenied)
        }
        Err(e) => {
            warn!("Error: pid {}: {}", pid, e);
            Err(Error::NotFound)
        }
    }
}

/// Resolve `path` to the inode behind it.
pub fn resolve_inode<K: KernelState + ?Sized>(
    kernel: &K,
    path: &str,
) -> Result<Resolved<ResolvedInodeInfo>> {
    match kernel.resolve_path_inode(path) {
        Ok(resolved) => {
            debug!(
                "Successfully found inode: {} for path name: {}",
                resolved.value.number, path
            );
            Ok(resolved)
        }
        Err(e) => {
            warn!("Error parsing path {:?}: {}", path, e);
            Err(Error::InvalidArgument)
        }
    }
}

/// Check that a cached resolution still describes the live resource.
pub fn revalidate<K: KernelState + ?Sized, T>(kernel: &K, resolved: &Resolved<T>) -> Result<()> {
    match kernel.generation(&resolved.key) {
        Some(generation) if generation == resolved.generation => Ok(()),
        Some(generation) => {
            warn!(
                "{:?} changed since resolution (generation {} -> {})",
                resolved.key, resolved.generation, generation
            );
            Err(Error::Stale)
        }
        None => {
            warn!("{:?} disappeared since resolution", resolved.key);
            Err(Error::Stale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kstate::ResourceKey;

    /// Kernel whose process lookups all fail with one error.
    struct Failing(LookupError);

    impl KernelState for Failing {
        fn find_process_first_mapping(
            &self,
            _pid: Pid,
        ) -> core::result::Result<Resolved<ResolvedMemoryRegion>, LookupError> {
            Err(self.0)
        }

        fn resolve_path_inode(
            &self,
            _path: &str,
        ) -> core::result::Result<Resolved<ResolvedInodeInfo>, LookupError> {
            Err(self.0)
        }

        fn generation(&self, _key: &ResourceKey) -> Option<u64> {
            None
        }
    }

    #[test]
    fn test_access_denied_reported_distinctly() {
        assert_eq!(
            resolve_memory_region(&Failing(LookupError::AccessDenied), 1).err(),
            Some(Error::PermissionDenied)
        );
        assert_eq!(
            resolve_memory_region(&Failing(LookupError::NoSuchProcess), 1).err(),
            Some(Error::NotFound)
        );
        assert_eq!(
            resolve_memory_region(&Failing(LookupError::NoAddressSpace), 1).err(),
            Some(Error::NotFound)
        );
    }
}
