//! Allocator Module - Size-Segregated Free-Space Management
//!
//! The [`FreeSpaceManager`] owns one committed region and three linear
//! allocators, one per size class. Mutators allocate through the atomic
//! bump fast path; a miss falls into the refill policy of the class, which
//! refills the allocator from the free-chunk list, delegates to a sibling
//! class, or triggers a collection.
//!
//! ## Size Classes
//!
//! | Allocator | Ceiling | Refill source |
//! |-----------|---------|---------------|
//! | Tiny | two machine words | 1 KiB pool carved from the small allocator |
//! | Small | `large_min_size` (default 4 KiB) | first fit over the free-chunk list, then GC |
//! | Large | unbounded | first fit over the shared free-chunk list, then GC |
//!
//! ## Allocation Flow
//!
//! ```text
//! mutator ──▶ bump fast path (CAS on mark)
//!                │ miss
//!                ▼
//!          refill policy (per-allocator mutex)
//!                │ refill from free chunks ──▶ retry fast path
//!                │ delegate to large path  ──▶ return cell
//!                └ Collector::collect ─────▶ retry, or OutOfMemory
//! ```
//!
//! ## Locking
//!
//! One refill mutex per allocator; the free-chunk list head lives inside
//! the small refill mutex. Lock order is tiny → small and large → small,
//! never the reverse, and no refill mutex is held while the collector
//! runs (the sweeper re-enters through
//! [`install_free_chunks`](FreeSpaceManager::install_free_chunks)).

pub mod linear;
mod refill;

pub use linear::LinearAllocator;

use crate::config::SpaceConfig;
use crate::error::{AllocError, Result};
use crate::heap::free_chunk::FreeChunkList;
use crate::heap::region::{CommittedRegion, REGION_ALIGNMENT};
use crate::heap::walker::HeapWalker;
use crate::object::header::TINY_CELL_SIZE;
use crate::stats::{SpaceStats, StatsSnapshot};
use crate::util::Alignment;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Size of the tiny-object pool carved from the front of the region, and
/// the alignment it is re-carved with on every refill (1 KiB)
pub const TINY_POOL_SIZE: usize = 1024;

/// The garbage-collection trigger invoked when the free-chunk list runs
/// dry.
///
/// `collect` returns `true` if, post-collection, a chunk of at least
/// `requested` bytes is available on the free-chunk list; the sweeper side
/// of the cycle installs that list through
/// [`FreeSpaceManager::install_free_chunks`]. On `true` the manager
/// re-enters its fast path; on `false` it raises
/// [`AllocError::OutOfMemory`].
///
/// On entry to `collect`, every linear allocator is filled
/// (`mark == end`), so no mutator holds a cell between any allocator's
/// bounds and the whole region parses as a tiling of cells.
pub trait Collector: Send + Sync {
    fn collect(&self, requested: usize) -> bool;
}

/// The free-space allocator core: one committed region, three size classes.
///
/// All allocation entry points are safe to call from any number of threads
/// concurrently.
///
/// # Examples
///
/// ```rust
/// use fsalloc::FreeSpaceManager;
///
/// let heap = FreeSpaceManager::with_capacity(64 * 1024)?;
/// let cell = heap.allocate(64)?;
/// let tiny = heap.allocate_tiny()?;
/// assert_ne!(cell, tiny);
/// # Ok::<(), fsalloc::AllocError>(())
/// ```
pub struct FreeSpaceManager {
    /// The committed memory everything below lives in
    region: CommittedRegion,

    /// Tiny-object allocator: cells of exactly two words
    tiny: LinearAllocator,

    /// Small-object allocator: requests up to `large_min_size`
    small: LinearAllocator,

    /// Large-object allocator: everything above the small ceiling
    large: LinearAllocator,

    /// Serializes tiny-pool refills
    tiny_refill: Mutex<()>,

    /// Serializes small refills and owns the free-chunk list head
    small_refill: Mutex<FreeChunkList>,

    /// Serializes large refills
    large_refill: Mutex<()>,

    /// Collection trigger; absent until the runtime attaches one
    collector: RwLock<Option<Arc<dyn Collector>>>,

    /// Frozen at initialization for the lifetime of the region
    config: SpaceConfig,

    stats: SpaceStats,
}

impl FreeSpaceManager {
    /// Initialize the manager over a committed region.
    ///
    /// Carves the first [`TINY_POOL_SIZE`] bytes into the tiny pool and
    /// hands the remainder to the small allocator as its initial chunk.
    /// The large allocator starts with zero bounds; it is fed exclusively
    /// through its refill policy.
    ///
    /// # Arguments
    /// * `region` - Committed memory; base must be 1 KiB-aligned
    /// * `config` - Tunables, frozen for the lifetime of the region
    ///
    /// # Returns
    /// * `Err(AllocError::Configuration)` - Invalid tunables
    /// * `Err(AllocError::HeapInitialization)` - Region too small or
    ///   misaligned
    pub fn new(region: CommittedRegion, config: SpaceConfig) -> Result<Self> {
        config.validate()?;

        if !Alignment::is_aligned(region.base(), REGION_ALIGNMENT) {
            return Err(AllocError::HeapInitialization(format!(
                "region base {:#x} must be {} byte aligned",
                region.base(),
                REGION_ALIGNMENT
            )));
        }
        if region.committed_size() <= TINY_POOL_SIZE {
            return Err(AllocError::HeapInitialization(format!(
                "region of {} bytes leaves nothing after the {} byte tiny pool",
                region.committed_size(),
                TINY_POOL_SIZE
            )));
        }

        let tiny = LinearAllocator::new();
        let small = LinearAllocator::new();
        let large = LinearAllocator::new();

        tiny.initialize(region.base(), TINY_POOL_SIZE, TINY_CELL_SIZE);
        small.initialize(
            region.base() + TINY_POOL_SIZE,
            region.committed_size() - TINY_POOL_SIZE,
            config.large_min_size,
        );
        large.initialize(0, 0, usize::MAX);

        log::info!(
            "free-space manager initialized: region {:#x}..{:#x}, tiny pool {} bytes, large threshold {} bytes",
            region.base(),
            region.end(),
            TINY_POOL_SIZE,
            config.large_min_size
        );

        Ok(Self {
            region,
            tiny,
            small,
            large,
            tiny_refill: Mutex::new(()),
            small_refill: Mutex::new(FreeChunkList::new()),
            large_refill: Mutex::new(()),
            collector: RwLock::new(None),
            config,
            stats: SpaceStats::new(),
        })
    }

    /// Reserve a fresh region of `committed` bytes and initialize over it
    /// with the default configuration.
    pub fn with_capacity(committed: usize) -> Result<Self> {
        Self::new(
            CommittedRegion::reserve_committed(committed)?,
            SpaceConfig::default(),
        )
    }

    /// Attach the collection trigger.
    ///
    /// Until one is attached, exhausting the free-chunk list raises
    /// [`AllocError::OutOfMemory`] directly.
    pub fn set_collector(&self, collector: Arc<dyn Collector>) {
        *self.collector.write() = Some(collector);
    }

    /// Allocate `size` bytes.
    ///
    /// `size` must be a positive machine-word multiple (debug-asserted).
    /// Requests above the small ceiling take the large-object path;
    /// everything else bumps out of the small allocator.
    ///
    /// # Returns
    /// Address of the cell. The bytes belong exclusively to the caller
    /// until it writes the cell header.
    pub fn allocate(&self, size: usize) -> Result<usize> {
        debug_assert!(size > 0, "allocation size must be positive");
        debug_assert!(
            Alignment::is_word_aligned(size),
            "allocation size must be word aligned"
        );

        if self.small.is_large(size) {
            return self.allocate_large(size);
        }

        let cell = loop {
            if let Some(cell) = self.small.try_allocate(size) {
                break cell;
            }
            if let Some(cell) = self.handle_small_failure(size, None)? {
                break cell;
            }
        };
        self.stats.record_small(size);
        Ok(cell)
    }

    /// Allocate one tiny cell (exactly two machine words).
    pub fn allocate_tiny(&self) -> Result<usize> {
        let cell = loop {
            if let Some(cell) = self.tiny.try_allocate(TINY_CELL_SIZE) {
                break cell;
            }
            if let Some(cell) = self.handle_tiny_failure()? {
                break cell;
            }
        };
        self.stats.record_tiny();
        Ok(cell)
    }

    /// Allocate `size` bytes on the large-object path.
    pub fn allocate_large(&self, size: usize) -> Result<usize> {
        debug_assert!(size > 0, "allocation size must be positive");
        debug_assert!(
            Alignment::is_word_aligned(size),
            "allocation size must be word aligned"
        );

        let cell = loop {
            if let Some(cell) = self.large.try_allocate(size) {
                break cell;
            }
            if let Some(cell) = self.handle_large_failure(size)? {
                break cell;
            }
        };
        self.stats.record_large(size);
        Ok(cell)
    }

    /// Install a new free-chunk list. This is the sweeper's interface:
    /// after a collection cycle it threads `(next, size)` words through
    /// each reclaimed range and hands over the head address (zero for an
    /// empty list).
    ///
    /// The manager never scans for free space itself; it only consumes
    /// this head pointer-chased.
    pub fn install_free_chunks(&self, head: usize) {
        let mut chunks = self.small_refill.lock();
        chunks.install(head);
        log::debug!("free-chunk list installed, head {:#x}", head);
    }

    /// Total bytes currently on the free-chunk list
    pub fn free_bytes(&self) -> usize {
        self.small_refill.lock().free_bytes()
    }

    /// Snapshot of `(address, size)` pairs on the free-chunk list
    pub fn free_chunks(&self) -> Vec<(usize, usize)> {
        self.small_refill.lock().chunks()
    }

    /// The committed region backing this manager
    pub fn region(&self) -> &CommittedRegion {
        &self.region
    }

    /// The tiny-cell allocator
    pub fn tiny_allocator(&self) -> &LinearAllocator {
        &self.tiny
    }

    /// The small-object allocator
    pub fn small_allocator(&self) -> &LinearAllocator {
        &self.small
    }

    /// The large-object allocator
    pub fn large_allocator(&self) -> &LinearAllocator {
        &self.large
    }

    /// Configuration frozen at initialization
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Allocation and refill counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// A parseability walker over the whole region
    pub fn walker(&self) -> HeapWalker<'_> {
        HeapWalker::new(self)
    }
}

impl std::fmt::Debug for FreeSpaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeSpaceManager")
            .field("region", &self.region)
            .field("tiny", &self.tiny)
            .field("small", &self.small)
            .field("large", &self.large)
            .finish()
    }
}
