//! Linear Allocator - Atomic Bump-Pointer Allocation
//!
//! Allocates space linearly from one chunk of the heap. The fast path is a
//! single compare-and-swap on the allocation mark: wait-free when no refill
//! is in progress, lock-free for every racer not holding the refill mutex.
//!
//! The allocator itself knows nothing about refilling. When the current
//! chunk cannot satisfy a request, [`try_allocate`](LinearAllocator::try_allocate)
//! returns `None` and the caller consults the refill policy for its size
//! class (see [`FreeSpaceManager`](crate::FreeSpaceManager)).
//!
//! # Memory Ordering Model
//!
//! - `mark` is the only CAS point. Loads are `Acquire`, successful CAS is
//!   `AcqRel`: a thread that observes a freshly refilled mark also observes
//!   the bounds published before it.
//! - `start` and `end` are written only under the refill mutex and read
//!   with `Relaxed` loads *after* an acquire-load of `mark`; the
//!   release-store of `mark` in [`refill`](LinearAllocator::refill) is what
//!   publishes them.
//! - A refill first forces `mark` to `end` ([`fill_up`](LinearAllocator::fill_up)),
//!   so a racer's CAS against a stale mark fails and the racer re-reads; it
//!   either serializes on the refill mutex or succeeds after the new bounds
//!   are published.

use crate::object::header::{self, TINY_CELL_SIZE};
use crate::util::Alignment;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A linear (bump-pointer) allocator over one chunk of committed memory.
///
/// Lifecycle: constructed uninitialized (refuses all allocations),
/// [`initialize`](Self::initialize)d exactly once with its bounds and size
/// ceiling, then [`refill`](Self::refill)ed with fresh chunks under the
/// owning refill mutex for the rest of its life.
pub struct LinearAllocator {
    /// Start of the current chunk
    start: AtomicUsize,

    /// Exclusive end of the current chunk
    end: AtomicUsize,

    /// Bump mark; `start <= mark <= end` at every suspension point
    mark: AtomicUsize,

    /// Largest request this allocator satisfies; set once at initialization
    ceiling: AtomicUsize,
}

impl LinearAllocator {
    /// Create an uninitialized allocator: zero bounds, zero ceiling,
    /// refuses every allocation until initialized.
    pub const fn new() -> Self {
        Self {
            start: AtomicUsize::new(0),
            end: AtomicUsize::new(0),
            mark: AtomicUsize::new(0),
            ceiling: AtomicUsize::new(0),
        }
    }

    /// Set bounds and ceiling, exactly once.
    ///
    /// A zero `chunk` leaves the allocator cleared (it refuses all
    /// allocations until the first refill); the large allocator starts its
    /// life this way.
    ///
    /// # Arguments
    /// * `chunk` - Base of the initial chunk, or zero
    /// * `chunk_size` - Size of the initial chunk in bytes
    /// * `ceiling` - Largest request to satisfy from this allocator
    pub fn initialize(&self, chunk: usize, chunk_size: usize, ceiling: usize) {
        debug_assert_eq!(
            self.ceiling.load(Ordering::Relaxed),
            0,
            "linear allocator initialized twice"
        );
        debug_assert!(ceiling > 0, "ceiling must be positive");

        self.ceiling.store(ceiling, Ordering::Relaxed);
        if chunk == 0 {
            self.clear();
        } else {
            self.refill(chunk, chunk_size);
        }
    }

    /// Bump-allocate `size` bytes from the current chunk.
    ///
    /// `size` must be positive and word-aligned (debug-asserted). Returns
    /// the cell address, or `None` when the chunk cannot hold the request
    /// and the caller must consult the refill policy. Concurrent callers
    /// receive disjoint ranges; the returned bytes belong exclusively to
    /// the caller until it writes the cell header.
    ///
    /// When the `heap-tags` feature is enabled the request is grown by one
    /// tag word on both sides of the bump computation and the returned
    /// address points past the tag.
    pub fn try_allocate(&self, size: usize) -> Option<usize> {
        debug_assert!(size > 0, "allocation size must be positive");
        debug_assert!(
            Alignment::is_word_aligned(size),
            "allocation size must be word aligned"
        );
        let total = header::adjust_for_debug_tag(size);

        loop {
            // Acquire: pairs with the release-store in refill so that the
            // end read below is at least as fresh as the mark.
            let cell = self.mark.load(Ordering::Acquire);
            let next = cell.checked_add(total)?;
            if next > self.end.load(Ordering::Relaxed) {
                return None;
            }

            match self
                .mark
                .compare_exchange_weak(cell, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    debug_assert!(cell <= next);
                    return Some(unsafe { header::apply_debug_tag(cell) });
                }
                // Lost the race (or spurious failure): re-read and retry.
                Err(_) => continue,
            }
        }
    }

    /// Bump-allocate `size` bytes at an `alignment`-aligned address.
    ///
    /// `alignment` must be a power of two and at least the machine word.
    /// If aligning the mark leaves a non-zero gap smaller than a tiny
    /// cell, the target is pushed one further `alignment` increment so the
    /// gap can always hold a dead-cell header. A successful allocation
    /// dead-fills the gap before returning, keeping the chunk parseable
    /// through the misaligned start.
    ///
    /// The `heap-tags` tag adjustment applies here exactly as in
    /// [`try_allocate`](Self::try_allocate): the claimed range grows by
    /// one tag word, placed so the address the caller sees still lands on
    /// the alignment boundary.
    pub fn try_allocate_aligned(&self, size: usize, alignment: usize) -> Option<usize> {
        debug_assert!(size > 0, "allocation size must be positive");
        debug_assert!(
            Alignment::is_word_aligned(size),
            "allocation size must be word aligned"
        );
        debug_assert!(
            alignment.is_power_of_two() && alignment >= header::WORD_SIZE,
            "alignment must be a power of two of at least one word"
        );
        let total = header::adjust_for_debug_tag(size);
        let tag = header::debug_tag_size();

        loop {
            let cell = self.mark.load(Ordering::Acquire);
            // Base of the claimed cell, placed so the address past the tag
            // word sits on the alignment boundary.
            let mut aligned_cell = Alignment::align_up(cell + tag, alignment) - tag;
            if aligned_cell != cell && aligned_cell - cell < TINY_CELL_SIZE {
                // The gap must hold a dead-cell header.
                aligned_cell += alignment;
            }
            let next = aligned_cell.checked_add(total)?;
            if next > self.end.load(Ordering::Relaxed) {
                return None;
            }

            match self
                .mark
                .compare_exchange_weak(cell, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    if aligned_cell > cell {
                        // The claimed range starts at the old mark; the
                        // padding in front of the aligned cell becomes a
                        // dead cell.
                        unsafe { header::fill_dead(cell, aligned_cell) };
                    }
                    return Some(unsafe { header::apply_debug_tag(aligned_cell) });
                }
                Err(_) => continue,
            }
        }
    }

    /// Force the allocator to its end and return the previous mark.
    ///
    /// Used by refill handlers to push every racer off the current chunk:
    /// after `fill_up`, any in-flight CAS fails, the racer observes
    /// `mark == end` and serializes on the refill mutex. The former
    /// `[mark, end)` tail is dead-filled so the chunk stays parseable.
    ///
    /// Idempotent: if the allocator is already filled (or cleared), returns
    /// the current mark without writing anything.
    pub fn fill_up(&self) -> usize {
        loop {
            let cell = self.mark.load(Ordering::Acquire);
            let end = self.end.load(Ordering::Relaxed);
            if cell == end {
                return cell;
            }

            if self
                .mark
                .compare_exchange_weak(cell, end, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                unsafe { header::fill_dead(cell, end) };
                return cell;
            }
        }
    }

    /// Install a fresh chunk.
    ///
    /// The caller must hold this allocator's refill mutex and have called
    /// [`fill_up`](Self::fill_up) first. Bounds are written before the
    /// release-store of `mark`; a fast-path reader that acquires the new
    /// mark therefore reads bounds at least as new.
    pub fn refill(&self, chunk: usize, chunk_size: usize) {
        debug_assert!(chunk != 0, "refill with null chunk");
        debug_assert!(Alignment::is_word_aligned(chunk));
        debug_assert!(chunk_size > 0 && Alignment::is_word_aligned(chunk_size));
        debug_assert_eq!(
            self.mark.load(Ordering::Relaxed),
            self.end.load(Ordering::Relaxed),
            "refill without a prior fill_up"
        );

        self.start.store(chunk, Ordering::Relaxed);
        self.end.store(chunk + chunk_size, Ordering::Relaxed);
        // Release: publishes the bounds above to fast-path readers.
        self.mark.store(chunk, Ordering::Release);
    }

    /// Zero all bounds; the allocator refuses allocations until the next
    /// refill. Must be called only under the refill mutex.
    pub fn clear(&self) {
        self.start.store(0, Ordering::Relaxed);
        self.end.store(0, Ordering::Relaxed);
        self.mark.store(0, Ordering::Release);
    }

    /// Check whether a request exceeds this allocator's ceiling
    #[inline]
    pub fn is_large(&self, size: usize) -> bool {
        size > self.ceiling.load(Ordering::Relaxed)
    }

    /// Largest request this allocator satisfies
    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling.load(Ordering::Relaxed)
    }

    /// Start of the current chunk
    #[inline]
    pub fn start(&self) -> usize {
        self.start.load(Ordering::Relaxed)
    }

    /// Exclusive end of the current chunk
    #[inline]
    pub fn end(&self) -> usize {
        self.end.load(Ordering::Relaxed)
    }

    /// Current bump mark
    #[inline]
    pub fn mark(&self) -> usize {
        self.mark.load(Ordering::Acquire)
    }

    /// Bytes remaining in the current chunk
    #[inline]
    pub fn remaining(&self) -> usize {
        let mark = self.mark.load(Ordering::Acquire);
        self.end.load(Ordering::Relaxed).saturating_sub(mark)
    }

    /// Size of the current chunk
    #[inline]
    pub fn capacity(&self) -> usize {
        self.end
            .load(Ordering::Relaxed)
            .saturating_sub(self.start.load(Ordering::Relaxed))
    }
}

impl Default for LinearAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinearAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearAllocator")
            .field("start", &format_args!("{:#x}", self.start()))
            .field("end", &format_args!("{:#x}", self.end()))
            .field("mark", &format_args!("{:#x}", self.mark()))
            .field("ceiling", &self.ceiling())
            .finish()
    }
}
