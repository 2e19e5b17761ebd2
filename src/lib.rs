//! Kernel Introspection Endpoints
//!
//! This crate exposes two pieces of live kernel state through file-like
//! write-then-read endpoints:
//!
//! - `inspect_vm_area` - write a process id, read its first memory mapping
//! - `inspect_inode` - write a path, read the metadata of its inode
//!
//! # Features
//!
//! - `axhal` - Kernel clock for endpoint statistics
//! - `linux-host` - [`linux::LinuxHost`] kernel state backed by procfs
//!
//! # Quick Start
//!
//! ```ignore
//! use alloc::sync::Arc;
//! use axinspect::{Credentials, EndpointRegistry, InspectService, ServiceConfig};
//!
//! let registry = Arc::new(EndpointRegistry::new());
//! let service = InspectService::start(ServiceConfig::default(), kernel, registry)?;
//!
//! let mut file = service.open("inspect_vm_area", Credentials::ROOT)?;
//! service.write(&mut file, "1")?;
//!
//! let mut record = [0u8; 1024];
//! let len = service.read(&mut file, &mut record)?;
//! // {"start": 94371909029888, "end": 94371909046272, "flags": 5, ...}
//!
//! // Or let the service do the round trip and parse the record:
//! let region: ResolvedMemoryRegion =
//!     service.query("inspect_vm_area", Credentials::ROOT, "1", 10)?;
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "linux-host")]
extern crate std;

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod platform;

// =============================================================================
// Protocol
// =============================================================================

pub mod buffer;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod record;
pub mod resolve;
pub mod slot;
pub mod stats;
pub mod user;

// =============================================================================
// Kernel State
// =============================================================================

pub mod kstate;
pub mod synthetic;

#[cfg(feature = "linux-host")]
pub mod linux;

// =============================================================================
// Service
// =============================================================================

pub mod registry;
pub mod service;

// Re-export key types for convenience
pub use config::{AccessPolicy, BUFFER_LENGTH, RepeatRead, ServiceConfig, is_verbose, set_verbose};
pub use endpoint::{Endpoint, EndpointId};
pub use error::{Error, Result};
pub use kstate::{
    KernelState, LookupError, Pid, Resolved, ResolvedInodeInfo, ResolvedMemoryRegion,
    ResourceKey,
};
pub use record::{MAX_RECORD_LEN, ParseRecordError, Record};
pub use registry::EndpointRegistry;
pub use service::{Credentials, InspectService, OpenFile, StartError};
pub use slot::SlotState;
pub use synthetic::{SyntheticKernel, SyntheticMapping};
