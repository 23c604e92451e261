//! Refill Policies - Slow-Path Handlers per Size Class
//!
//! One handler per allocator, statically dispatched: the set of size
//! classes is closed and the miss path sits right under the allocation
//! fast path. Each handler runs under its allocator's refill mutex and
//! follows the same shape:
//!
//! 1. Re-try the fast path. A racer that lost the mutex race finds the
//!    pool already refilled and must not discard it.
//! 2. `fill_up` the allocator, forcing every remaining racer off the
//!    chunk and dead-filling the tail.
//! 3. Obtain a fresh chunk (pool carve, first fit, or collection) and
//!    `refill`.
//!
//! A handler returns `Ok(Some(cell))` when it served the request directly
//! (delegation or a lock-race win), `Ok(None)` when the caller should
//! retry the fast path, and `Err` only for out-of-memory.

use super::{FreeSpaceManager, TINY_POOL_SIZE};
use crate::error::{AllocError, Result};
use crate::object::header::{adjust_for_debug_tag, TINY_CELL_SIZE};

impl FreeSpaceManager {
    /// Tiny refill policy: carve a fresh 1 KiB, 1 KiB-aligned pool out of
    /// the small allocator.
    pub(super) fn handle_tiny_failure(&self) -> Result<Option<usize>> {
        let _guard = self.tiny_refill.lock();

        if let Some(cell) = self.tiny.try_allocate(TINY_CELL_SIZE) {
            return Ok(Some(cell));
        }

        let filled = self.tiny.fill_up();
        debug_assert!(
            self.tiny.end() - filled < adjust_for_debug_tag(TINY_CELL_SIZE),
            "tiny pool had usable space left on refill"
        );

        // The small path raises OutOfMemory itself if the heap is truly
        // exhausted; a null pool cannot come back from it.
        let pool = self.allocate_small_aligned(TINY_POOL_SIZE, TINY_POOL_SIZE)?;
        self.tiny.refill(pool, TINY_POOL_SIZE);
        self.stats.record_tiny_refill();
        log::debug!("tiny pool refilled at {:#x}", pool);

        Ok(None)
    }

    /// Small refill policy: delegate over-ceiling requests to the large
    /// path, otherwise first-fit over the free-chunk list, otherwise
    /// trigger a collection.
    pub(super) fn handle_small_failure(
        &self,
        size: usize,
        alignment: Option<usize>,
    ) -> Result<Option<usize>> {
        if self.small.is_large(size) {
            // Alignment is not carried across the delegation; the only
            // in-tree aligned caller is the tiny refill, whose 1 KiB pool
            // request never exceeds the ceiling.
            if let Some(alignment) = alignment {
                log::warn!(
                    "alignment {} dropped delegating {} bytes to the large path",
                    alignment,
                    size
                );
            }
            return self.allocate_large(size).map(Some);
        }

        {
            let mut chunks = self.small_refill.lock();

            let retry = match alignment {
                Some(alignment) => self.small.try_allocate_aligned(size, alignment),
                None => self.small.try_allocate(size),
            };
            if let Some(cell) = retry {
                return Ok(Some(cell));
            }

            self.small.fill_up();

            if let Some((chunk, chunk_size)) = chunks.first_fit(adjust_for_debug_tag(size)) {
                self.small.refill(chunk, chunk_size);
                self.stats.record_small_refill();
                log::debug!(
                    "small allocator refilled with chunk {:#x} ({} bytes)",
                    chunk,
                    chunk_size
                );
                return Ok(None);
            }
        }
        // Mutex released: the sweeper re-enters install_free_chunks while
        // the collector runs.
        self.trigger_collection(size)
    }

    /// Large refill policy: first-fit the shared free-chunk list for a
    /// whole chunk of at least the requested size, bypassing the
    /// small-object fast path; otherwise trigger a collection.
    pub(super) fn handle_large_failure(&self, size: usize) -> Result<Option<usize>> {
        let guard = self.large_refill.lock();

        if let Some(cell) = self.large.try_allocate(size) {
            return Ok(Some(cell));
        }

        self.large.fill_up();

        {
            let mut chunks = self.small_refill.lock();
            if let Some((chunk, chunk_size)) = chunks.first_fit(adjust_for_debug_tag(size)) {
                self.large.refill(chunk, chunk_size);
                self.stats.record_large_refill();
                log::debug!(
                    "large allocator refilled with chunk {:#x} ({} bytes)",
                    chunk,
                    chunk_size
                );
                return Ok(None);
            }
        }

        drop(guard);
        self.trigger_collection(size)
    }

    /// Aligned small allocation; only the tiny refill uses it, to carve
    /// pool-aligned pools.
    pub(super) fn allocate_small_aligned(&self, size: usize, alignment: usize) -> Result<usize> {
        loop {
            if let Some(cell) = self.small.try_allocate_aligned(size, alignment) {
                return Ok(cell);
            }
            if let Some(cell) = self.handle_small_failure(size, Some(alignment))? {
                return Ok(cell);
            }
        }
    }

    /// Hand the request to the collector, or raise out-of-memory.
    fn trigger_collection(&self, size: usize) -> Result<Option<usize>> {
        let collector = self.collector.read().clone();
        let Some(collector) = collector else {
            return self.out_of_memory(size);
        };

        // Contract with the collector: every allocator is filled before
        // the cycle starts, so no mutator sits between any allocator's
        // bounds and the whole region parses as a tiling of cells.
        self.tiny.fill_up();
        self.small.fill_up();
        self.large.fill_up();

        self.stats.record_collection();
        log::debug!("allocation of {} bytes triggered a collection", size);

        if collector.collect(size) {
            // The sweeper installed a fresh list; the next fast-path miss
            // picks a chunk up. No manual refill here.
            Ok(None)
        } else {
            self.out_of_memory(size)
        }
    }

    fn out_of_memory(&self, size: usize) -> Result<Option<usize>> {
        self.stats.record_failure();
        let available = self.free_bytes();
        log::warn!(
            "out of memory: requested {} bytes, {} bytes on the free-chunk list",
            size,
            available
        );
        Err(AllocError::OutOfMemory {
            requested: size,
            available,
        })
    }
}
