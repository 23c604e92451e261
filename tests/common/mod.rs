//! Test Utilities for the Free-Space Allocator Suite
//!
//! A fixture around a fresh manager, a mock collector standing in for the
//! tracing collector + sweeper pair, and strict assertion helpers.

#![allow(dead_code)]

use fsalloc::heap::free_chunk::format_chunk;
use fsalloc::object::header::write_header;
use fsalloc::{CellKind, Collector, FreeSpaceManager};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Default heap size for tests (64 KiB)
pub const DEFAULT_HEAP_SIZE: usize = 64 * 1024;

/// Test fixture owning a fresh manager per test
pub struct HeapFixture {
    pub heap: Arc<FreeSpaceManager>,
}

impl HeapFixture {
    /// 64 KiB heap, default thresholds
    pub fn with_defaults() -> Self {
        Self::with_capacity(DEFAULT_HEAP_SIZE)
    }

    pub fn with_capacity(committed: usize) -> Self {
        let heap = FreeSpaceManager::with_capacity(committed)
            .expect("manager initialization should succeed");
        Self {
            heap: Arc::new(heap),
        }
    }

    /// Region base address
    pub fn base(&self) -> usize {
        self.heap.region().base()
    }

    /// Allocate and immediately head the cell as a live object, the way a
    /// mutator does. Keeps the region parseable for walker assertions.
    pub fn alloc_live(&self, size: usize) -> usize {
        let cell = self.heap.allocate(size).expect("allocation should succeed");
        unsafe { write_header(cell, CellKind::Live, size) };
        cell
    }

    /// Tiny-cell variant of [`alloc_live`](Self::alloc_live)
    pub fn alloc_tiny_live(&self) -> usize {
        let cell = self
            .heap
            .allocate_tiny()
            .expect("tiny allocation should succeed");
        unsafe { write_header(cell, CellKind::Live, fsalloc::TINY_CELL_SIZE) };
        cell
    }

    /// Allocate live cells until the small allocator has less than `floor`
    /// bytes remaining. Returns the cells.
    pub fn exhaust_small_to(&self, floor: usize) -> Vec<usize> {
        let mut cells = Vec::new();
        loop {
            let remaining = self.heap.small_allocator().remaining();
            if remaining < floor {
                break;
            }
            let size = remaining.min(4096);
            cells.push(self.alloc_live(size));
        }
        cells
    }
}

/// Mock collector + sweeper: on `collect`, formats the ranges it was primed
/// with into a free-chunk list and installs it, then answers per the
/// collector contract (true iff a fitting chunk is now listed).
pub struct MockCollector {
    heap: Weak<FreeSpaceManager>,
    /// Ranges to reclaim on the next cycle, as `(address, size)`
    pending: Mutex<Vec<(usize, usize)>>,
    calls: AtomicUsize,
    /// Force `collect` to report failure regardless of pending chunks
    fail: AtomicBool,
}

impl MockCollector {
    pub fn new(heap: &Arc<FreeSpaceManager>) -> Arc<Self> {
        Arc::new(Self {
            heap: Arc::downgrade(heap),
            pending: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    /// Prime the next cycle with a range to reclaim
    pub fn prime(&self, addr: usize, size: usize) {
        self.pending.lock().unwrap().push((addr, size));
    }

    /// Make every subsequent cycle report failure
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Number of collection cycles triggered
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Collector for MockCollector {
    fn collect(&self, requested: usize) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return false;
        }
        let Some(heap) = self.heap.upgrade() else {
            return false;
        };

        let reclaimed: Vec<(usize, usize)> = self.pending.lock().unwrap().drain(..).collect();
        if reclaimed.is_empty() {
            return false;
        }

        // Thread the list back to front, head first in priming order.
        let mut head = 0;
        for &(addr, size) in reclaimed.iter().rev() {
            unsafe { format_chunk(addr, size, head) };
            head = addr;
        }
        heap.install_free_chunks(head);

        reclaimed.iter().any(|&(_, size)| size >= requested)
    }
}

/// Assert every address is unique
pub fn assert_all_addresses_unique(addrs: &[usize]) {
    let unique: HashSet<_> = addrs.iter().collect();
    assert_eq!(
        unique.len(),
        addrs.len(),
        "duplicate cell addresses handed out"
    );
}

/// Assert `[addr, addr + size)` lies inside the fixture's region
pub fn assert_cell_in_region(fixture: &HeapFixture, addr: usize, size: usize) {
    assert!(
        fixture.heap.region().contains_range(addr, size),
        "cell {:#x}+{} outside the committed region",
        addr,
        size
    );
}

/// Assert cells are pairwise disjoint given their sizes
pub fn assert_cells_disjoint(cells: &[(usize, usize)]) {
    let mut sorted: Vec<_> = cells.to_vec();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        let (a, a_size) = pair[0];
        let (b, _) = pair[1];
        assert!(
            a + a_size <= b,
            "cells overlap: {:#x}+{} and {:#x}",
            a,
            a_size,
            b
        );
    }
}
