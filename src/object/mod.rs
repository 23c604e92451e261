//! Object model: the cell-header word that keeps the heap parseable.

pub mod header;

pub use header::{CellKind, HEADER_SIZE, TINY_CELL_SIZE, WORD_SIZE};
