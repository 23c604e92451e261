//! Allocation Tests - Region Carve, Dispatch, and Boundaries
//!
//! Verifies the initialization partition, sequential bump arithmetic, the
//! exact-fit and ceiling boundaries, and out-of-memory behavior with no
//! collector attached. Mark arithmetic assumes untagged cells.

#![cfg(not(feature = "heap-tags"))]

mod common;

use common::{assert_all_addresses_unique, assert_cell_in_region, HeapFixture};
use fsalloc::{AllocError, FreeSpaceManager, TINY_CELL_SIZE, TINY_POOL_SIZE, WORD_SIZE};

#[test]
fn test_initial_partition() {
    let fixture = HeapFixture::with_defaults();
    let base = fixture.base();
    let heap = &fixture.heap;

    // Tiny pool: the first 1 KiB.
    let tiny = heap.tiny_allocator();
    assert_eq!(tiny.start(), base);
    assert_eq!(tiny.end(), base + TINY_POOL_SIZE);
    assert_eq!(tiny.mark(), base);
    assert_eq!(tiny.ceiling(), TINY_CELL_SIZE);

    // Small allocator: the remainder of the region.
    let small = heap.small_allocator();
    assert_eq!(small.start(), base + TINY_POOL_SIZE);
    assert_eq!(small.end(), base + 64 * 1024);
    assert_eq!(small.mark(), base + TINY_POOL_SIZE);
    assert_eq!(small.ceiling(), 4096);

    // Large allocator: zero bounds until its first refill.
    let large = heap.large_allocator();
    assert_eq!(large.start(), 0);
    assert_eq!(large.end(), 0);
    assert_eq!(large.mark(), 0);

    // Free-chunk list starts empty.
    assert_eq!(heap.free_bytes(), 0);
    assert!(heap.free_chunks().is_empty());
}

#[test]
fn test_sequential_small_allocation() {
    let fixture = HeapFixture::with_defaults();
    let base = fixture.base();

    let mut cells = Vec::new();
    for _ in 0..100 {
        cells.push(fixture.heap.allocate(64).unwrap());
    }

    // 100 * 64 = 6400 bytes bumped past the tiny pool.
    assert_eq!(cells[0], base + TINY_POOL_SIZE);
    assert_eq!(
        fixture.heap.small_allocator().mark(),
        base + TINY_POOL_SIZE + 6400
    );
    assert_all_addresses_unique(&cells);
    for &cell in &cells {
        assert_cell_in_region(&fixture, cell, 64);
    }
}

#[test]
fn test_tiny_allocation_basic() {
    let fixture = HeapFixture::with_defaults();
    let base = fixture.base();

    let a = fixture.heap.allocate_tiny().unwrap();
    let b = fixture.heap.allocate_tiny().unwrap();

    assert_eq!(a, base);
    assert_eq!(b, base + TINY_CELL_SIZE);
    assert_eq!(fixture.heap.tiny_allocator().mark(), base + 2 * TINY_CELL_SIZE);
}

#[test]
fn test_exact_fit_then_miss() {
    let fixture = HeapFixture::with_defaults();
    let heap = &fixture.heap;

    let remaining = heap.small_allocator().remaining();
    // Consume all but one 64-byte slot, in ceiling-sized bites.
    let mut left = remaining - 64;
    while left > 0 {
        let bite = left.min(4096);
        heap.allocate(bite).unwrap();
        left -= bite;
    }

    // Exactly the remaining bytes succeeds.
    assert_eq!(heap.small_allocator().remaining(), 64);
    let last = heap.allocate(64).unwrap();
    assert_cell_in_region(&fixture, last, 64);
    assert_eq!(heap.small_allocator().remaining(), 0);

    // One more word has nowhere to go: list empty, no collector.
    let result = heap.allocate(WORD_SIZE);
    assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
}

#[test]
fn test_ceiling_boundary_dispatch() {
    let fixture = HeapFixture::with_defaults();
    let heap = &fixture.heap;
    let small_mark = heap.small_allocator().mark();

    // Exactly the ceiling stays on the small path.
    let cell = heap.allocate(4096).unwrap();
    assert_eq!(cell, small_mark);
    assert_eq!(heap.small_allocator().mark(), small_mark + 4096);

    // One word over goes down the large path; with zero large bounds and
    // an empty list, that is out-of-memory.
    let result = heap.allocate(4096 + WORD_SIZE);
    assert!(matches!(result, Err(AllocError::OutOfMemory { .. })));
    // The small allocator never saw the request.
    assert_eq!(heap.small_allocator().mark(), small_mark + 4096);
}

#[test]
fn test_oom_reports_requested_and_available() {
    let fixture = HeapFixture::with_defaults();

    match fixture.heap.allocate_large(1 << 20) {
        Err(AllocError::OutOfMemory {
            requested,
            available,
        }) => {
            assert_eq!(requested, 1 << 20);
            assert_eq!(available, 0);
        }
        other => panic!("expected OutOfMemory, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_mark_monotonic_between_refills() {
    let fixture = HeapFixture::with_defaults();
    let mut last = fixture.heap.small_allocator().mark();

    for _ in 0..50 {
        fixture.heap.allocate(32).unwrap();
        let mark = fixture.heap.small_allocator().mark();
        assert!(mark > last, "bump mark must be monotonic");
        last = mark;
    }
}

#[test]
fn test_stats_counters() {
    let fixture = HeapFixture::with_defaults();
    let heap = &fixture.heap;

    heap.allocate(64).unwrap();
    heap.allocate(128).unwrap();
    heap.allocate_tiny().unwrap();
    let _ = heap.allocate_large(8192);

    let stats = heap.stats();
    assert_eq!(stats.small_allocations, 2);
    assert_eq!(stats.tiny_allocations, 1);
    assert_eq!(stats.large_allocations, 0);
    assert_eq!(stats.bytes_allocated, 64 + 128 + TINY_CELL_SIZE);
    assert_eq!(stats.failures, 1);
}

#[test]
fn test_rejects_undersized_region() {
    // A region that leaves nothing after the tiny pool is refused.
    assert!(FreeSpaceManager::with_capacity(TINY_POOL_SIZE).is_err());
}

#[test]
fn test_small_heap_still_serves() {
    // Smallest viable heap: tiny pool + one more KiB.
    let fixture = HeapFixture::with_capacity(2 * TINY_POOL_SIZE);
    let cell = fixture.heap.allocate(256).unwrap();
    assert_cell_in_region(&fixture, cell, 256);
}
