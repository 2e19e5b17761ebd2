//! Kernel state of a Linux host.
//!
//! Answers the memory-region query from `/proc/<pid>/maps` and the inode
//! query from `stat(2)`. Process generations are the process start time, so
//! a recycled pid is detected as stale; inode generations are the inode
//! change time.
//!
//! `/proc/<pid>/maps` only exposes the permission string, so region flags
//! are rebuilt from its `rwxs` characters alone ([`VM_READ`], [`VM_WRITE`],
//! [`VM_EXEC`], [`VM_SHARED`]). The remaining `vm_flags` bits a kernel would
//! report (`VM_MAYREAD`, `VM_GROWSDOWN`, ...) are always zero here.

use alloc::string::{String, ToString};
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use crate::kstate::{
    KernelState, LookupError, Pid, Resolved, ResolvedInodeInfo, ResolvedMemoryRegion,
    ResourceKey, path_errno,
};

pub const VM_READ: u64 = 0x0000_0001;
pub const VM_WRITE: u64 = 0x0000_0002;
pub const VM_EXEC: u64 = 0x0000_0004;
pub const VM_SHARED: u64 = 0x0000_0008;

/// [`KernelState`] backed by procfs and the host filesystem.
pub struct LinuxHost {
    proc_root: PathBuf,
}

impl LinuxHost {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Use a procfs mounted somewhere other than `/proc`.
    pub fn with_proc_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            proc_root: root.into(),
        }
    }

    fn proc_file(&self, pid: Pid, name: &str) -> Result<String, LookupError> {
        let path = self.proc_root.join(pid.to_string()).join(name);
        fs::read_to_string(&path).map_err(|e| {
            debug!("reading {}: {}", path.display(), e);
            process_lookup_error(&e)
        })
    }

    fn start_time(&self, pid: Pid) -> Result<u64, LookupError> {
        parse_start_time(&self.proc_file(pid, "stat")?).ok_or(LookupError::NoSuchProcess)
    }
}

/// Map a failed procfs read to a lookup error.
///
/// A permission failure means the process exists but belongs to someone
/// else; everything else is treated as the process being gone.
pub fn process_lookup_error(e: &io::Error) -> LookupError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => LookupError::AccessDenied,
        _ => LookupError::NoSuchProcess,
    }
}

impl Default for LinuxHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one line of `/proc/<pid>/maps`.
///
/// ```text
/// 00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon
/// ```
pub fn parse_map_line(line: &str) -> Option<ResolvedMemoryRegion> {
    let mut fields = line.split_ascii_whitespace();
    let (start, end) = fields.next()?.split_once('-')?;
    let perms = fields.next()?.as_bytes();
    let _offset = fields.next()?;
    let _device = fields.next()?;
    let inode: u64 = fields.next()?.parse().ok()?;

    let mut flags = 0;
    for (i, bit) in [VM_READ, VM_WRITE, VM_EXEC].into_iter().enumerate() {
        if perms.get(i).is_some_and(|&p| p != b'-') {
            flags |= bit;
        }
    }
    if perms.get(3) == Some(&b's') {
        flags |= VM_SHARED;
    }

    Some(ResolvedMemoryRegion {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        flags,
        has_prev: false,
        has_next: false,
        backing_inode: (inode != 0).then_some(inode),
    })
}

/// Extract the start time (field 22) from `/proc/<pid>/stat`.
pub fn parse_start_time(stat: &str) -> Option<u64> {
    // The command name may contain spaces and parentheses; fields resume
    // after the last ')'. Field 3 is the first one after it.
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_ascii_whitespace().nth(22 - 3)?.parse().ok()
}

fn inode_generation(meta: &fs::Metadata) -> u64 {
    (meta.ctime() as u64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(meta.ctime_nsec() as u64)
}

impl KernelState for LinuxHost {
    fn find_process_first_mapping(
        &self,
        pid: Pid,
    ) -> Result<Resolved<ResolvedMemoryRegion>, LookupError> {
        let generation = self.start_time(pid)?;
        let maps = self.proc_file(pid, "maps")?;

        let mut lines = maps.lines().filter(|line| !line.trim().is_empty());
        let first = lines.next().ok_or(LookupError::NoAddressSpace)?;
        let mut region = parse_map_line(first).ok_or_else(|| {
            warn!("unparsable maps line for pid {}: {:?}", pid, first);
            LookupError::NoAddressSpace
        })?;
        region.has_next = lines.next().is_some();

        Ok(Resolved::new(region, ResourceKey::Process(pid), generation))
    }

    fn resolve_path_inode(&self, path: &str) -> Result<Resolved<ResolvedInodeInfo>, LookupError> {
        let meta = fs::metadata(path).map_err(|e| {
            LookupError::Path(e.raw_os_error().unwrap_or(path_errno::EINVAL))
        })?;

        let info = ResolvedInodeInfo {
            number: meta.ino(),
            size_hint: meta.size(),
            access_time: meta.atime(),
            modify_time: meta.mtime(),
            change_time: meta.ctime(),
        };
        let key = ResourceKey::Inode {
            path: path.to_string(),
            device: meta.dev(),
            number: meta.ino(),
        };
        Ok(Resolved::new(info, key, inode_generation(&meta)))
    }

    fn generation(&self, key: &ResourceKey) -> Option<u64> {
        match key {
            ResourceKey::Process(pid) => self.start_time(*pid).ok(),
            ResourceKey::Inode {
                path,
                device,
                number,
            } => {
                let meta = fs::metadata(path).ok()?;
                (meta.dev() == *device && meta.ino() == *number).then(|| inode_generation(&meta))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_backed_line() {
        let region =
            parse_map_line("00400000-00452000 r-xp 00000000 08:02 173521      /usr/bin/dbus-daemon")
                .unwrap();
        assert_eq!(region.start, 0x400000);
        assert_eq!(region.end, 0x452000);
        assert_eq!(region.flags, VM_READ | VM_EXEC);
        assert_eq!(region.backing_inode, Some(173521));
    }

    #[test]
    fn test_parse_anonymous_shared_line() {
        let region = parse_map_line("7f0000000000-7f0000001000 rw-s 00000000 00:00 0").unwrap();
        assert_eq!(region.flags, VM_READ | VM_WRITE | VM_SHARED);
        assert_eq!(region.backing_inode, None);
    }

    #[test]
    fn test_parse_start_time_with_spaces_in_comm() {
        let stat = "42 (my (odd) proc) S 1 42 42 0 -1 4194560 100 0 0 0 1 2 0 0 20 0 1 0 98765 1000 10";
        assert_eq!(parse_start_time(stat), Some(98765));
    }

    #[test]
    fn test_permission_denied_is_not_missing_process() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(process_lookup_error(&denied), LookupError::AccessDenied);

        let missing = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(process_lookup_error(&missing), LookupError::NoSuchProcess);
    }
}
