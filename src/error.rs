//! Error Types
//!
//! All failures surfaced by the allocator. Out-of-memory is the only error
//! an allocation entry point returns to a mutator; everything else either
//! retries internally or is a debug-build assertion.

use thiserror::Error;

/// Main error type for all allocator operations
#[derive(Debug, Error)]
pub enum AllocError {
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    #[error("Heap initialization failed: {0}")]
    HeapInitialization(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] crate::config::ConfigError),

    #[error("Heap not parseable: malformed cell header at {address:#x}")]
    UnparseableHeap { address: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AllocError {
    /// Check if this error is recoverable by freeing memory and retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AllocError::OutOfMemory { .. })
    }

    /// Check if this error indicates a bug rather than resource exhaustion
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            AllocError::UnparseableHeap { .. } | AllocError::Internal(_)
        )
    }
}

/// Result type alias for allocator operations
pub type Result<T> = std::result::Result<T, AllocError>;
