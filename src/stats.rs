//! Per-endpoint statistics.
//!
//! Counters are updated lock-free by the endpoint handlers and read out as a
//! [`StatsSnapshot`].

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::platform;

/// Counters for a single endpoint.
#[derive(Debug)]
pub struct EndpointStats {
    /// Number of write calls.
    writes: AtomicU64,
    /// Number of read calls, including end-of-data reads.
    reads: AtomicU64,
    /// Successful deposits into the slot.
    deposits: AtomicU64,
    /// Records delivered to a caller.
    records: AtomicU64,
    /// Writes refused because a deposit was pending.
    busy: AtomicU64,
    /// Calls that failed for any reason.
    failures: AtomicU64,
    /// Timestamp of the last call.
    last_access_ns: AtomicU64,
}

/// Point-in-time copy of [`EndpointStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub writes: u64,
    pub reads: u64,
    pub deposits: u64,
    pub records: u64,
    pub busy: u64,
    pub failures: u64,
    pub last_access_ns: u64,
}

impl EndpointStats {
    /// Create a zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            writes: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            deposits: AtomicU64::new(0),
            records: AtomicU64::new(0),
            busy: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            last_access_ns: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        self.last_access_ns
            .store(platform::time_ns(), Ordering::Relaxed);
    }

    /// Record the outcome of a write call.
    pub fn record_write(&self, outcome: Result<usize, Error>) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.touch();
        match outcome {
            Ok(_) => {
                self.deposits.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => self.record_failure(err),
        }
    }

    /// Record the outcome of a read call. A zero-length read is end-of-data.
    pub fn record_read(&self, outcome: Result<usize, Error>) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.touch();
        match outcome {
            Ok(0) => {}
            Ok(_) => {
                self.records.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => self.record_failure(err),
        }
    }

    fn record_failure(&self, err: Error) {
        if err == Error::Busy {
            self.busy.fetch_add(1, Ordering::Relaxed);
        }
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            deposits: self.deposits.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            busy: self.busy.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            last_access_ns: self.last_access_ns.load(Ordering::Relaxed),
        }
    }
}

impl Default for EndpointStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_counts_as_failure() {
        let stats = EndpointStats::new();
        stats.record_write(Ok(4));
        stats.record_write(Err(Error::Busy));
        stats.record_read(Ok(0));

        let snap = stats.snapshot();
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.deposits, 1);
        assert_eq!(snap.busy, 1);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.records, 0);
    }
}
