//! Heap Walker - Parseability Verification
//!
//! Walks the committed region from its base, cell by cell, deriving each
//! cell's extent from its header. A successful walk tiles
//! `[base, base + committed)` exactly: live cells, dead fillers, free
//! chunks, and the unallocated tails of the current allocator chunks, with
//! no gap and no overlap. Any malformed header stops the walk with
//! [`AllocError::UnparseableHeap`].
//!
//! The tail of an allocator's current chunk (`[mark, end)`) carries no
//! header until the next `fill_up`; the walker recognizes those ranges by
//! asking the manager for the live marks and reports them as
//! [`ParsedKind::AllocatorTail`].

use crate::error::{AllocError, Result};
use crate::object::header::{self, CellKind};
use crate::FreeSpaceManager;

/// Kind of a cell encountered during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedKind {
    /// Live object headed by the mutator
    Live,
    /// Dead filler (padding, refill tail, dark matter)
    Dead,
    /// Free chunk on the free-chunk list
    Free,
    /// Headerless tail of a current allocator chunk, `[mark, end)`
    AllocatorTail,
}

impl From<CellKind> for ParsedKind {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Live => ParsedKind::Live,
            CellKind::Dead => ParsedKind::Dead,
            CellKind::Free => ParsedKind::Free,
        }
    }
}

/// One cell of the tiling produced by a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCell {
    /// Base address of the cell
    pub addr: usize,
    /// Extent in bytes
    pub size: usize,
    pub kind: ParsedKind,
}

/// A parseability walker over one manager's region.
///
/// Walking concurrently with mutators is racy by nature (a mutator may not
/// have headed its cell yet); walks are meaningful at safepoints and in
/// tests.
pub struct HeapWalker<'a> {
    manager: &'a FreeSpaceManager,
}

impl<'a> HeapWalker<'a> {
    pub(crate) fn new(manager: &'a FreeSpaceManager) -> Self {
        Self { manager }
    }

    /// Parse the whole region into its cell tiling.
    ///
    /// # Returns
    /// * `Ok(cells)` - The tiling; cell extents sum to the committed size
    /// * `Err(AllocError::UnparseableHeap)` - A header failed to decode or
    ///   claimed an extent outside the region
    pub fn walk(&self) -> Result<Vec<ParsedCell>> {
        let region = self.manager.region();
        let limit = region.end();

        // Unheaded tails of the current chunks, keyed by their mark.
        let tails: Vec<(usize, usize)> = [
            self.manager.tiny_allocator(),
            self.manager.small_allocator(),
            self.manager.large_allocator(),
        ]
        .iter()
        .map(|a| (a.mark(), a.end()))
        .filter(|&(mark, end)| mark < end)
        .collect();

        let mut cells = Vec::new();
        let mut cursor = region.base();

        while cursor < limit {
            if let Some(&(mark, end)) = tails.iter().find(|&&(mark, _)| mark == cursor) {
                cells.push(ParsedCell {
                    addr: cursor,
                    size: end - mark,
                    kind: ParsedKind::AllocatorTail,
                });
                cursor = end;
                continue;
            }

            #[cfg(feature = "heap-tags")]
            {
                if unsafe { crate::memory::read_word(cursor) } == header::DEBUG_TAG_WORD {
                    cursor += header::WORD_SIZE;
                    continue;
                }
            }

            match unsafe { header::read_header(cursor) } {
                Some((kind, size)) if cursor.checked_add(size).is_some_and(|e| e <= limit) => {
                    cells.push(ParsedCell {
                        addr: cursor,
                        size,
                        kind: kind.into(),
                    });
                    cursor += size;
                }
                _ => {
                    return Err(AllocError::UnparseableHeap { address: cursor });
                }
            }
        }

        debug_assert_eq!(cursor, limit, "walk overran the region");
        Ok(cells)
    }

    /// Walk and verify the tiling covers the region exactly.
    pub fn verify(&self) -> Result<()> {
        let cells = self.walk()?;
        let covered: usize = cells.iter().map(|c| c.size).sum();
        let committed = self.manager.region().committed_size();

        // Under heap-tags, tag words are skipped rather than attributed
        // to a cell, so the covered sum undershoots by one word per
        // tagged cell.
        let exact = !cfg!(feature = "heap-tags");
        if covered > committed || (exact && covered != committed) {
            return Err(AllocError::Internal(format!(
                "tiling covers {} of {} committed bytes",
                covered, committed
            )));
        }
        Ok(())
    }
}
