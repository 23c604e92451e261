//! Allocation Statistics
//!
//! Relaxed atomic counters maintained by the manager; statistics only, no
//! ordering requirements.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters kept by a [`FreeSpaceManager`](crate::FreeSpaceManager)
#[derive(Debug, Default)]
pub struct SpaceStats {
    tiny_allocations: AtomicUsize,
    small_allocations: AtomicUsize,
    large_allocations: AtomicUsize,
    bytes_allocated: AtomicUsize,
    tiny_refills: AtomicUsize,
    small_refills: AtomicUsize,
    large_refills: AtomicUsize,
    collections: AtomicUsize,
    failures: AtomicUsize,
}

impl SpaceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tiny(&self) {
        self.tiny_allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(crate::object::header::TINY_CELL_SIZE, Ordering::Relaxed);
    }

    pub(crate) fn record_small(&self, size: usize) {
        self.small_allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated.fetch_add(size, Ordering::Relaxed);
    }

    pub(crate) fn record_large(&self, size: usize) {
        self.large_allocations.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated.fetch_add(size, Ordering::Relaxed);
    }

    pub(crate) fn record_tiny_refill(&self) {
        self.tiny_refills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_small_refill(&self) {
        self.small_refills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_large_refill(&self) {
        self.large_refills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collection(&self) {
        self.collections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tiny_allocations: self.tiny_allocations.load(Ordering::Relaxed),
            small_allocations: self.small_allocations.load(Ordering::Relaxed),
            large_allocations: self.large_allocations.load(Ordering::Relaxed),
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            tiny_refills: self.tiny_refills.load(Ordering::Relaxed),
            small_refills: self.small_refills.load(Ordering::Relaxed),
            large_refills: self.large_refills.load(Ordering::Relaxed),
            collections: self.collections.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`SpaceStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Tiny cells handed out
    pub tiny_allocations: usize,
    /// Small cells handed out
    pub small_allocations: usize,
    /// Large cells handed out
    pub large_allocations: usize,
    /// Total bytes across all classes
    pub bytes_allocated: usize,
    /// Tiny-pool refills
    pub tiny_refills: usize,
    /// Small-allocator refills from the free-chunk list
    pub small_refills: usize,
    /// Large-allocator refills from the free-chunk list
    pub large_refills: usize,
    /// Collections triggered by allocation failure
    pub collections: usize,
    /// Out-of-memory failures raised
    pub failures: usize,
}
