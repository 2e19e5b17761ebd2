//! In-memory kernel state.
//!
//! [`SyntheticKernel`] models a process table and a flat path namespace
//! (whole-path symbolic links only). Every change to a process or inode
//! assigns it a new generation, so cached resolutions can be detected as
//! stale.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use spin::Mutex;

use crate::kstate::{
    KernelState, LookupError, Pid, Resolved, ResolvedInodeInfo, ResolvedMemoryRegion,
    ResourceKey, path_errno,
};

/// Longest accepted path, in bytes.
pub const PATH_MAX: usize = 4096;

/// Maximum number of symbolic links followed during one lookup.
const MAX_SYMLINKS: usize = 40;

/// One mapping of a synthetic process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticMapping {
    pub start: u64,
    pub end: u64,
    pub flags: u64,
    pub backing_inode: Option<u64>,
}

impl SyntheticMapping {
    /// Anonymous mapping.
    pub fn anonymous(start: u64, end: u64, flags: u64) -> Self {
        Self {
            start,
            end,
            flags,
            backing_inode: None,
        }
    }

    /// File-backed mapping.
    pub fn file(start: u64, end: u64, flags: u64, inode: u64) -> Self {
        Self {
            start,
            end,
            flags,
            backing_inode: Some(inode),
        }
    }
}

struct Process {
    /// `None` for kernel threads.
    mappings: Option<Vec<SyntheticMapping>>,
    generation: u64,
}

enum Node {
    Inode {
        device: u64,
        info: ResolvedInodeInfo,
        generation: u64,
    },
    Symlink(String),
}

struct Tables {
    processes: BTreeMap<Pid, Process>,
    nodes: BTreeMap<String, Node>,
    next_generation: u64,
}

impl Tables {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn lookup(&self, path: &str) -> Result<(u64, ResolvedInodeInfo, u64), LookupError> {
        if path.len() >= PATH_MAX {
            return Err(LookupError::Path(path_errno::ENAMETOOLONG));
        }
        let mut current = path;
        for _ in 0..=MAX_SYMLINKS {
            match self.nodes.get(current) {
                Some(Node::Inode {
                    device,
                    info,
                    generation,
                }) => return Ok((*device, *info, *generation)),
                Some(Node::Symlink(target)) => current = target,
                None => return Err(LookupError::Path(path_errno::ENOENT)),
            }
        }
        Err(LookupError::Path(path_errno::ELOOP))
    }
}

/// In-memory [`KernelState`].
pub struct SyntheticKernel {
    tables: Mutex<Tables>,
}

impl SyntheticKernel {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                processes: BTreeMap::new(),
                nodes: BTreeMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Add a user process. Mappings are kept ordered by start address.
    pub fn spawn(&self, pid: Pid, mut mappings: Vec<SyntheticMapping>) {
        mappings.sort_by_key(|m| m.start);
        let mut tables = self.tables.lock();
        let generation = tables.bump();
        tables.processes.insert(
            pid,
            Process {
                mappings: Some(mappings),
                generation,
            },
        );
    }

    /// Add a process without a user address space.
    pub fn spawn_kernel_thread(&self, pid: Pid) {
        let mut tables = self.tables.lock();
        let generation = tables.bump();
        tables.processes.insert(
            pid,
            Process {
                mappings: None,
                generation,
            },
        );
    }

    /// Replace the mappings of `pid`. Returns false if it does not exist.
    pub fn remap(&self, pid: Pid, mut mappings: Vec<SyntheticMapping>) -> bool {
        mappings.sort_by_key(|m| m.start);
        let mut tables = self.tables.lock();
        let generation = tables.bump();
        match tables.processes.get_mut(&pid) {
            Some(process) => {
                process.mappings = Some(mappings);
                process.generation = generation;
                true
            }
            None => false,
        }
    }

    /// Remove `pid` from the process table.
    pub fn exit(&self, pid: Pid) -> bool {
        self.tables.lock().processes.remove(&pid).is_some()
    }

    /// Create or replace the inode at `path`.
    pub fn add_inode(&self, path: &str, device: u64, info: ResolvedInodeInfo) {
        let mut tables = self.tables.lock();
        let generation = tables.bump();
        tables.nodes.insert(
            path.to_string(),
            Node::Inode {
                device,
                info,
                generation,
            },
        );
    }

    /// Create a symbolic link at `link` pointing to `target`.
    pub fn symlink(&self, link: &str, target: &str) {
        self.tables
            .lock()
            .nodes
            .insert(link.to_string(), Node::Symlink(target.to_string()));
    }

    /// Modify the inode stored at `path`. Returns false if there is none.
    pub fn update_inode<F: FnOnce(&mut ResolvedInodeInfo)>(&self, path: &str, update: F) -> bool {
        let mut tables = self.tables.lock();
        let next = tables.bump();
        match tables.nodes.get_mut(path) {
            Some(Node::Inode {
                info, generation, ..
            }) => {
                update(info);
                *generation = next;
                true
            }
            _ => false,
        }
    }

    /// Remove the entry at `path`.
    pub fn remove(&self, path: &str) -> bool {
        self.tables.lock().nodes.remove(path).is_some()
    }
}

impl Default for SyntheticKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelState for SyntheticKernel {
    fn find_process_first_mapping(
        &self,
        pid: Pid,
    ) -> Result<Resolved<ResolvedMemoryRegion>, LookupError> {
        let tables = self.tables.lock();
        let process = tables
            .processes
            .get(&pid)
            .ok_or(LookupError::NoSuchProcess)?;
        let mappings = process
            .mappings
            .as_ref()
            .ok_or(LookupError::NoAddressSpace)?;
        let first = mappings.first().ok_or(LookupError::NoAddressSpace)?;

        let region = ResolvedMemoryRegion {
            start: first.start,
            end: first.end,
            flags: first.flags,
            has_prev: false,
            has_next: mappings.len() > 1,
            backing_inode: first.backing_inode,
        };
        Ok(Resolved::new(
            region,
            ResourceKey::Process(pid),
            process.generation,
        ))
    }

    fn resolve_path_inode(&self, path: &str) -> Result<Resolved<ResolvedInodeInfo>, LookupError> {
        let (device, info, generation) = self.tables.lock().lookup(path)?;
        let key = ResourceKey::Inode {
            path: path.to_string(),
            device,
            number: info.number,
        };
        Ok(Resolved::new(info, key, generation))
    }

    fn generation(&self, key: &ResourceKey) -> Option<u64> {
        let tables = self.tables.lock();
        match key {
            ResourceKey::Process(pid) => tables.processes.get(pid).map(|p| p.generation),
            ResourceKey::Inode {
                path,
                device,
                number,
            } => match tables.lookup(path) {
                Ok((dev, info, generation)) if dev == *device && info.number == *number => {
                    Some(generation)
                }
                _ => None,
            },
        }
    }
}
