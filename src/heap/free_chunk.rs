//! Free-Chunk List - Sweeper-Threaded Free Space
//!
//! Free space reclaimed by a collection cycle is tracked as a singly linked
//! list threaded directly through the heap. Each chunk is a contiguous
//! range of at least [`MIN_CHUNK_BYTES`] (and at least the configured
//! `free_chunk_min_size`); its base carries a free-cell header covering the
//! whole range, and its last two words hold the address of the next chunk
//! (zero terminates the list) and the chunk's own size in bytes.
//!
//! ```text
//! ┌────────────┬──────── payload ────────┬───────────┬───────────┐
//! │ free header│                         │   next    │   size    │
//! └────────────┴─────────────────────────┴───────────┴───────────┘
//!  chunk                                  chunk+size-2w chunk+size-1w
//! ```
//!
//! The head of the list is a raw `usize` address, never a typed reference:
//! a tracing collector walking object references must not follow these
//! links, so the list stays invisible to the trace by construction.
//! Contiguous free spans below the configured minimum are dark matter:
//! untracked, dead-headed, recovered only by a later collection.

use crate::memory;
use crate::object::header::{self, CellKind, WORD_SIZE};
use crate::util::Alignment;

/// Structural minimum for a free chunk: four machine words (header, one
/// payload word, trailing next and size words)
pub const MIN_CHUNK_WORDS: usize = 4;

/// [`MIN_CHUNK_WORDS`] in bytes
pub const MIN_CHUNK_BYTES: usize = MIN_CHUNK_WORDS * WORD_SIZE;

/// Format `[chunk, chunk + size)` as a free chunk linked to `next`.
///
/// Writes the free-cell header at the base and the trailing
/// `(next, size)` words. This is the sweeper-side helper: a sweeper
/// formats each reclaimed range back to front, then hands the head address
/// to [`FreeSpaceManager::install_free_chunks`](crate::FreeSpaceManager::install_free_chunks).
///
/// # Safety
///
/// `[chunk, chunk + size)` must be committed, writable memory owned by the
/// caller, with `chunk` word-aligned and `size` a word multiple of at
/// least [`MIN_CHUNK_BYTES`].
pub unsafe fn format_chunk(chunk: usize, size: usize, next: usize) {
    debug_assert!(Alignment::is_word_aligned(chunk));
    debug_assert!(Alignment::is_word_aligned(size));
    debug_assert!(size >= MIN_CHUNK_BYTES, "free chunk below 4 words");

    header::write_header(chunk, CellKind::Free, size);
    memory::write_word(next_slot(chunk, size), next);
    memory::write_word(size_slot(chunk, size), size);
}

/// Size in bytes of the chunk at `chunk`, from its header.
///
/// # Safety
///
/// `chunk` must be the base of a formatted free chunk in committed memory.
pub unsafe fn chunk_size(chunk: usize) -> usize {
    let (kind, size) = header::read_header(chunk)
        .expect("free chunk header is malformed");
    debug_assert_eq!(kind, CellKind::Free, "listed chunk is not free-headed");
    debug_assert_eq!(
        memory::read_word(size_slot(chunk, size)),
        size,
        "free chunk trailing size disagrees with its header"
    );
    size
}

/// Successor of the chunk at `chunk` (zero if it is the last).
///
/// # Safety
///
/// `chunk` must be the base of a formatted free chunk of `size` bytes.
pub unsafe fn chunk_next(chunk: usize, size: usize) -> usize {
    memory::read_word(next_slot(chunk, size))
}

/// Relink the chunk at `chunk` to a new successor.
///
/// # Safety
///
/// `chunk` must be the base of a formatted free chunk of `size` bytes in
/// committed memory, with no concurrent access to its trailing words.
unsafe fn set_chunk_next(chunk: usize, size: usize, next: usize) {
    memory::write_word(next_slot(chunk, size), next);
}

#[inline]
fn next_slot(chunk: usize, size: usize) -> usize {
    chunk + size - 2 * WORD_SIZE
}

#[inline]
fn size_slot(chunk: usize, size: usize) -> usize {
    chunk + size - WORD_SIZE
}

/// The free-chunk list consumed by the refill policies.
///
/// Holds only the head address. Mutated exclusively under the small
/// allocator's refill mutex; the
/// [`FreeSpaceManager`](crate::FreeSpaceManager) wraps it accordingly.
#[derive(Debug, Default)]
pub struct FreeChunkList {
    head: usize,
}

impl FreeChunkList {
    /// Empty list
    pub fn new() -> Self {
        Self { head: 0 }
    }

    /// Replace the whole list with the one starting at `head`.
    ///
    /// Zero empties the list. Called when a sweeper finishes a cycle.
    pub fn install(&mut self, head: usize) {
        self.head = head;
    }

    /// Head address; zero when empty
    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == 0
    }

    /// First-fit scan: unlink and return the first chunk of at least
    /// `size` bytes, as `(address, chunk_size)`.
    ///
    /// The chunk is consumed whole; there is no splitting, so a chunk
    /// larger than the request leaves the list entirely and its unused
    /// tail is recovered only by the next collection cycle.
    pub fn first_fit(&mut self, size: usize) -> Option<(usize, usize)> {
        let mut prev: usize = 0;
        let mut prev_size: usize = 0;
        let mut cursor = self.head;

        while cursor != 0 {
            let csize = unsafe { chunk_size(cursor) };
            let cnext = unsafe { chunk_next(cursor, csize) };

            if csize >= size {
                if prev == 0 {
                    self.head = cnext;
                } else {
                    unsafe { set_chunk_next(prev, prev_size, cnext) };
                }
                log::trace!(
                    "first-fit: {} bytes from chunk {:#x} ({} bytes)",
                    size,
                    cursor,
                    csize
                );
                return Some((cursor, csize));
            }

            prev = cursor;
            prev_size = csize;
            cursor = cnext;
        }

        None
    }

    /// Total free bytes on the list
    pub fn free_bytes(&self) -> usize {
        self.chunks().iter().map(|&(_, size)| size).sum()
    }

    /// Number of chunks on the list
    pub fn chunk_count(&self) -> usize {
        self.chunks().len()
    }

    /// Snapshot of `(address, size)` pairs, head first.
    ///
    /// Diagnostic walk; the refill policies only ever use `first_fit`.
    pub fn chunks(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while cursor != 0 {
            let csize = unsafe { chunk_size(cursor) };
            out.push((cursor, csize));
            cursor = unsafe { chunk_next(cursor, csize) };
        }
        out
    }
}
