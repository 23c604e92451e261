//! # fsalloc - Free-Space Allocator Core for a Mark-Sweep Heap
//!
//! `fsalloc` is the free-space allocation core of a managed-runtime heap:
//! it carves user-requested cells out of one contiguous committed region
//! using size-segregated atomic bump pointers, backed by a free-chunk list
//! that an external sweeper threads through the heap after each collection
//! cycle.
//!
//! ## Overview
//!
//! - **Wait-free fast path**: allocation is one compare-and-swap on a bump
//!   mark; no locks, no handler calls, no blocking.
//! - **Size segregation**: three linear allocators (tiny, small, large),
//!   each with its own refill policy and refill mutex.
//! - **Parseable heap**: every byte of committed space is walkable as a
//!   sequence of well-formed cells at all times; gaps are dead-filled.
//! - **Collection trigger**: when the free-chunk list runs dry, the
//!   attached [`Collector`] is invoked; out-of-memory is the only
//!   user-visible failure.
//!
//! Deliberately simple scaffolding for a mark-sweep-evacuate collector to
//! grow under: no compaction, no generations, no NUMA awareness, and free
//! space never returns to the operating system.
//!
//! ## Quick Start
//!
//! ```rust
//! use fsalloc::FreeSpaceManager;
//!
//! fn main() -> Result<(), fsalloc::AllocError> {
//!     // 64 KiB heap, default thresholds (4 KiB large, 512-byte chunks)
//!     let heap = FreeSpaceManager::with_capacity(64 * 1024)?;
//!
//!     // Bump-allocate some cells
//!     let a = heap.allocate(64)?;
//!     let b = heap.allocate(64)?;
//!     assert_ne!(a, b);
//!
//!     // Tiny cells come from their own pool
//!     let t = heap.allocate_tiny()?;
//!     assert!(heap.region().contains(t));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Mutator Threads                       │
//! │      allocate_tiny()   allocate()   allocate_large()    │
//! └───────────┬───────────────┬───────────────┬─────────────┘
//!             ▼               ▼               ▼
//!      ┌───────────┐   ┌───────────┐   ┌───────────┐
//!      │   Tiny    │   │   Small   │   │   Large   │   CAS fast path
//!      │ allocator │   │ allocator │   │ allocator │
//!      └─────┬─────┘   └─────┬─────┘   └─────┬─────┘
//!            │ miss          │ miss          │ miss
//!            ▼               ▼               ▼
//!      1 KiB pool      first fit over   first fit over
//!      carved from ──▶ free-chunk list  free-chunk list
//!      Small path            │               │
//!                            └───────┬───────┘
//!                                    ▼
//!                          Collector::collect()
//!                            │true        │false
//!                            ▼            ▼
//!                          retry      OutOfMemory
//! ```
//!
//! The sweeper side of a collection cycle writes `(next, size)` into the
//! trailing words of each reclaimed range and installs the head address
//! through [`FreeSpaceManager::install_free_chunks`]; ranges below the
//! configured minimum stay untracked as dead-headed dark matter.
//!
//! ## Thread Safety
//!
//! - [`FreeSpaceManager`] is `Send + Sync`; all allocation entry points
//!   are safe under full concurrency.
//! - Refills serialize on one mutex per allocator; racers observe
//!   `mark == end` and either take the mutex themselves or succeed right
//!   after the new bounds are published.
//! - The free-chunk list head is a raw address mutated only under the
//!   small refill mutex and invisible to reference tracing.
//!
//! ## Modules
//!
//! - [`allocator`]: linear allocators, refill policies, the manager
//! - [`config`]: runtime-tunable thresholds, frozen at initialization
//! - [`error`]: error types
//! - [`heap`]: committed region, free-chunk list, parseability walker
//! - [`memory`]: raw word access
//! - [`object`]: the cell-header word
//! - [`stats`]: allocation counters
//! - [`util`]: alignment helpers

pub mod allocator;
pub mod config;
pub mod error;
pub mod heap;
pub mod memory;
pub mod object;
pub mod stats;
pub mod util;

pub use allocator::{Collector, FreeSpaceManager, LinearAllocator, TINY_POOL_SIZE};
pub use config::SpaceConfig;
pub use error::{AllocError, Result};
pub use heap::{CommittedRegion, FreeChunkList, HeapWalker, ParsedCell, ParsedKind};
pub use object::{CellKind, TINY_CELL_SIZE, WORD_SIZE};
pub use stats::StatsSnapshot;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
