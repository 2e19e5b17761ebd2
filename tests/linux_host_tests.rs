//! Integration tests for the procfs-backed kernel state.
//!
//! Only built with the `linux-host` feature; queries the test process itself.

#![cfg(feature = "linux-host")]

use std::os::unix::fs::MetadataExt;
use std::sync::Arc;

use axinspect::linux::{LinuxHost, VM_EXEC, VM_READ};
use axinspect::{
    Credentials, EndpointRegistry, Error, InspectService, KernelState, LookupError,
    ServiceConfig,
};

#[test]
fn test_own_first_mapping() {
    let host = LinuxHost::new();
    let resolved = host.find_process_first_mapping(std::process::id()).unwrap();
    assert!(resolved.value.start < resolved.value.end);
    assert!(!resolved.value.has_prev);
    assert_eq!(host.generation(&resolved.key), Some(resolved.generation));
}

#[test]
fn test_missing_pid() {
    let host = LinuxHost::new();
    assert!(matches!(
        host.find_process_first_mapping(u32::MAX - 1),
        Err(LookupError::NoSuchProcess)
    ));
}

/// A procfs tree under the temp directory holding the given pid files.
fn fake_proc(tag: &str, files: &[(&str, &str)]) -> std::path::PathBuf {
    let root = std::env::temp_dir().join(format!("axinspect-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    for (path, contents) in files {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    root
}

const STAT: &str = "42 (sh) S 1 42 42 0 -1 4194560 100 0 0 0 1 2 0 0 20 0 1 0 98765 1000 10";

#[test]
fn test_proc_root_first_mapping() {
    let root = fake_proc(
        "maps",
        &[
            ("42/stat", STAT),
            (
                "42/maps",
                "00400000-00452000 r-xp 00000000 08:02 173521 /bin/sh\n\
                 7ffc0000-7ffc1000 rw-p 00000000 00:00 0 [stack]\n",
            ),
        ],
    );
    let host = LinuxHost::with_proc_root(&root);
    let resolved = host.find_process_first_mapping(42).unwrap();
    let _ = std::fs::remove_dir_all(&root);

    assert_eq!(resolved.value.start, 0x400000);
    // Only the permission characters survive into the flags.
    assert_eq!(resolved.value.flags, VM_READ | VM_EXEC);
    assert!(resolved.value.has_next);
    assert_eq!(resolved.value.backing_inode, Some(173521));
    assert_eq!(resolved.generation, 98765);
}

#[test]
fn test_proc_root_missing_maps_is_missing_process() {
    let root = fake_proc("nomaps", &[("42/stat", STAT)]);
    let host = LinuxHost::with_proc_root(&root);
    let result = host.find_process_first_mapping(42);
    let _ = std::fs::remove_dir_all(&root);

    assert!(matches!(result, Err(LookupError::NoSuchProcess)));
}

#[test]
fn test_root_inode_matches_metadata() {
    let host = LinuxHost::new();
    let resolved = host.resolve_path_inode("/").unwrap();
    let meta = std::fs::metadata("/").unwrap();
    assert_eq!(resolved.value.number, meta.ino());
    assert_eq!(resolved.value.modify_time, meta.mtime());
}

#[test]
fn test_missing_path_errno() {
    let host = LinuxHost::new();
    assert!(matches!(
        host.resolve_path_inode("/definitely/not/here"),
        Err(LookupError::Path(2))
    ));
}

#[test]
fn test_service_round_trip() {
    let registry = Arc::new(EndpointRegistry::new());
    let service =
        InspectService::start(ServiceConfig::default(), LinuxHost::new(), registry).unwrap();

    let mut file = service.open("inspect_vm_area", Credentials::ROOT).unwrap();
    service
        .write(&mut file, std::process::id().to_string().as_str())
        .unwrap();
    let mut buf = [0u8; 1024];
    let len = service.read(&mut file, &mut buf).unwrap();
    let record = std::str::from_utf8(&buf[..len]).unwrap();
    assert!(record.starts_with("{\"start\": "));
    assert!(record.ends_with("}\n"));

    let mut file = service.open("inspect_inode", Credentials::ROOT).unwrap();
    assert!(matches!(
        service.write(&mut file, "/definitely/not/here"),
        Err(Error::InvalidArgument)
    ));
}
