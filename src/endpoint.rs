//! Read/write endpoints.
//!
//! An endpoint ties together its scratch buffer, decoder, resolver, slot and
//! serializer:
//!
//! - `write`: stage payload -> decode -> resolve -> deposit
//! - `read`: consume -> re-validate -> serialize -> copy out
//!
//! Reads are single-shot: a read at a non-zero offset reports end-of-data.

use alloc::string::{String, ToString};
use core::fmt::Debug;

use spin::Mutex;

use crate::buffer::ScratchBuffer;
use crate::config::{self, ServiceConfig};
use crate::decode;
use crate::error::{Error, Result};
use crate::kstate::{KernelState, Pid, Resolved, ResolvedInodeInfo, ResolvedMemoryRegion};
use crate::record::Record;
use crate::resolve;
use crate::slot::{Slot, SlotState};
use crate::stats::{EndpointStats, StatsSnapshot};
use crate::user::{UserSink, UserSource};

/// Which resource an endpoint exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EndpointId {
    /// First memory mapping of a process.
    VmArea,
    /// Inode metadata of a path.
    Inode,
}

/// Resource-specific half of an endpoint.
pub trait EndpointKind: Send + Sync + 'static {
    /// Identifier decoded from the write payload.
    type Request;
    /// Resource rendered on read.
    type Resource: Record + Clone + Debug + Send;

    const ID: EndpointId;

    /// Parse the staged payload.
    fn decode(payload: &[u8]) -> Result<Self::Request>;

    /// Resolve the request against the kernel state.
    fn resolve<K: KernelState + ?Sized>(
        kernel: &K,
        request: &Self::Request,
    ) -> Result<Resolved<Self::Resource>>;
}

/// Memory-region endpoint: a process id in, its first mapping out.
pub struct VmArea;

impl EndpointKind for VmArea {
    type Request = Pid;
    type Resource = ResolvedMemoryRegion;

    const ID: EndpointId = EndpointId::VmArea;

    fn decode(payload: &[u8]) -> Result<Pid> {
        decode::decode_pid(payload)
    }

    fn resolve<K: KernelState + ?Sized>(
        kernel: &K,
        pid: &Pid,
    ) -> Result<Resolved<ResolvedMemoryRegion>> {
        resolve::resolve_memory_region(kernel, *pid)
    }
}

/// Inode endpoint: a path in, its inode metadata out.
pub struct Inode;

impl EndpointKind for Inode {
    type Request = String;
    type Resource = ResolvedInodeInfo;

    const ID: EndpointId = EndpointId::Inode;

    fn decode(payload: &[u8]) -> Result<String> {
        decode::decode_path(payload).map(|path| path.to_string())
    }

    fn resolve<K: KernelState + ?Sized>(
        kernel: &K,
        path: &String,
    ) -> Result<Resolved<ResolvedInodeInfo>> {
        resolve::resolve_inode(kernel, path)
    }
}

/// One pseudo-file endpoint.
pub struct Endpoint<E: EndpointKind> {
    name: String,
    slot: Slot<Resolved<E::Resource>>,
    scratch: Mutex<ScratchBuffer>,
    stale_check: bool,
    stats: EndpointStats,
}

impl<E: EndpointKind> Endpoint<E> {
    /// Create an endpoint with an empty slot.
    ///
    /// `config.buffer_capacity` must hold a whole record; the service checks
    /// this before building its endpoints.
    pub(crate) fn new(name: &str, config: &ServiceConfig) -> Self {
        Self {
            name: name.to_string(),
            slot: Slot::new(config.repeat_read),
            scratch: Mutex::new(ScratchBuffer::with_capacity(config.buffer_capacity)),
            stale_check: config.stale_check,
            stats: EndpointStats::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> EndpointId {
        E::ID
    }

    /// Handoff state of the slot.
    pub fn slot_state(&self) -> SlotState {
        self.slot.state()
    }

    /// The cached resolution, if any.
    pub fn cached(&self) -> Option<E::Resource> {
        self.slot.peek().map(|resolved| resolved.value)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle a write: resolve the identifier in `src` and deposit it.
    ///
    /// Returns the number of payload bytes accepted, which is capped at the
    /// buffer capacity.
    pub fn write<K, S>(&self, kernel: &K, src: &S) -> Result<usize>
    where
        K: KernelState + ?Sized,
        S: UserSource + ?Sized,
    {
        let outcome = self.handle_write(kernel, src);
        self.stats.record_write(outcome);
        outcome
    }

    fn handle_write<K, S>(&self, kernel: &K, src: &S) -> Result<usize>
    where
        K: KernelState + ?Sized,
        S: UserSource + ?Sized,
    {
        let (request, accepted) = {
            let mut scratch = self.scratch.lock();
            let accepted = scratch.stage(src)?;
            (E::decode(scratch.payload())?, accepted)
        };

        let resolved = E::resolve(kernel, &request)?;
        self.slot.deposit(resolved)?;
        Ok(accepted)
    }

    /// Handle a read at `*offset` into `dst`.
    ///
    /// Returns the record length, or 0 for end-of-data.
    pub fn read<K, D>(&self, kernel: &K, offset: &mut u64, dst: &mut D) -> Result<usize>
    where
        K: KernelState + ?Sized,
        D: UserSink + ?Sized,
    {
        let outcome = self.handle_read(kernel, offset, dst);
        self.stats.record_read(outcome);
        outcome
    }

    fn handle_read<K, D>(&self, kernel: &K, offset: &mut u64, dst: &mut D) -> Result<usize>
    where
        K: KernelState + ?Sized,
        D: UserSink + ?Sized,
    {
        if *offset > 0 {
            return Ok(0);
        }

        let mut scratch = self.scratch.lock();
        if dst.capacity() < scratch.capacity() {
            warn!("Buffer size too small");
            return Err(Error::BufferTooSmall);
        }

        let resolved = self.slot.consume()?;
        if self.stale_check {
            resolve::revalidate(kernel, &*resolved)?;
        }

        let len = scratch.format(&resolved.value)?;
        if dst.copy_from(scratch.payload()).is_err() {
            error!("Error copying data to user");
            return Err(Error::TransportFault);
        }

        if config::is_verbose() {
            info!(
                "[{}] {}",
                self.name,
                core::str::from_utf8(scratch.payload())
                    .unwrap_or_default()
                    .trim_end()
            );
        }

        *offset += len as u64;
        Ok(len)
    }
}
