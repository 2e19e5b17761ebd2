//! Platform abstraction layer for kernel operations.
//!
//! Provides the monotonic clock used to timestamp endpoint activity, with a
//! mock implementation so the endpoints can be exercised in user space.

use core::sync::atomic::{AtomicU64, Ordering};

/// Platform operations trait.
///
/// Abstracts over kernel-specific operations to enable mock testing.
pub trait PlatformOps {
    /// Get current monotonic time in nanoseconds.
    fn time_ns() -> u64;
}

// =============================================================================
// Real Implementation (kernel environment with axhal)
// =============================================================================

/// Real platform operations using axhal.
#[cfg(all(not(test), feature = "axhal"))]
pub struct RealPlatform;

#[cfg(all(not(test), feature = "axhal"))]
impl PlatformOps for RealPlatform {
    fn time_ns() -> u64 {
        axhal::time::monotonic_time().as_nanos() as u64
    }
}

// =============================================================================
// Mock Implementation (test environment or no axhal)
// =============================================================================

/// Mock time value for testing.
static MOCK_TIME_NS: AtomicU64 = AtomicU64::new(1_000_000_000); // 1 second

/// Mock platform operations for testing.
#[cfg(any(test, not(feature = "axhal")))]
pub struct MockPlatform;

#[cfg(any(test, not(feature = "axhal")))]
impl PlatformOps for MockPlatform {
    fn time_ns() -> u64 {
        MOCK_TIME_NS.load(Ordering::Relaxed)
    }
}

/// Set mock time for testing.
pub fn set_mock_time(ns: u64) {
    MOCK_TIME_NS.store(ns, Ordering::Relaxed);
}

/// Advance mock time by given nanoseconds.
pub fn advance_mock_time(ns: u64) {
    MOCK_TIME_NS.fetch_add(ns, Ordering::Relaxed);
}

/// The active platform implementation.
#[cfg(all(not(test), feature = "axhal"))]
pub type Platform = RealPlatform;

#[cfg(any(test, not(feature = "axhal")))]
pub type Platform = MockPlatform;

/// Get current time in nanoseconds.
#[inline]
pub fn time_ns() -> u64 {
    Platform::time_ns()
}
