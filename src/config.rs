//! Configuration - Allocator Tuning Parameters
//!
//! The two runtime-tunable sizes of the free-space core. Both are read at
//! region initialization and frozen for the lifetime of the region.

use crate::object::header::{TINY_CELL_SIZE, WORD_SIZE};

const KB: usize = 1024;

/// Configuration for a [`FreeSpaceManager`](crate::FreeSpaceManager)
///
/// # Examples
///
/// ```rust
/// use fsalloc::SpaceConfig;
///
/// // Defaults: 4 KiB large threshold, 512-byte free-chunk minimum
/// let config = SpaceConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Custom threshold
/// let config = SpaceConfig {
///     large_min_size: 8 * 1024,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SpaceConfig {
    /// Minimum size, in bytes, to be treated as a large object.
    ///
    /// Requests above this go down the large-object path; the small
    /// allocator's ceiling is set to this value.
    ///
    /// Default: 4 KiB
    pub large_min_size: usize,

    /// Minimum size, in bytes, of contiguous free space worth a free-list
    /// entry.
    ///
    /// Below this the sweeper leaves the space in place as dark matter,
    /// headed by a dead cell.
    ///
    /// Default: 512
    pub free_chunk_min_size: usize,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        SpaceConfig {
            large_min_size: 4 * KB,
            free_chunk_min_size: 512,
        }
    }
}

impl SpaceConfig {
    /// Validate configuration
    ///
    /// Checks that both sizes are word-aligned and large enough for the
    /// structures that live inside them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.large_min_size == 0 || self.large_min_size % WORD_SIZE != 0 {
            return Err(ConfigError::InvalidLargeMinSize(format!(
                "large_min_size ({}) must be a positive word multiple",
                self.large_min_size
            )));
        }

        // The tiny pool is carved from the small allocator, so the small
        // ceiling must admit a 1 KiB request.
        if self.large_min_size < KB {
            return Err(ConfigError::InvalidLargeMinSize(format!(
                "large_min_size ({}) must be at least the tiny pool size ({})",
                self.large_min_size, KB
            )));
        }

        if self.free_chunk_min_size % WORD_SIZE != 0 {
            return Err(ConfigError::InvalidFreeChunkMinSize(format!(
                "free_chunk_min_size ({}) must be a word multiple",
                self.free_chunk_min_size
            )));
        }

        // A free chunk needs room for its trailing (next, size) words plus
        // a header and at least one payload word.
        let chunk_floor = 2 * TINY_CELL_SIZE;
        if self.free_chunk_min_size < chunk_floor {
            return Err(ConfigError::InvalidFreeChunkMinSize(format!(
                "free_chunk_min_size ({}) must be at least {} bytes",
                self.free_chunk_min_size, chunk_floor
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with:
    /// - `FSALLOC_LARGE_MIN_SIZE`
    /// - `FSALLOC_FREE_CHUNK_MIN_SIZE`
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FSALLOC_LARGE_MIN_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.large_min_size = size;
            }
        }

        if let Ok(val) = std::env::var("FSALLOC_FREE_CHUNK_MIN_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.free_chunk_min_size = size;
            }
        }

        config
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid large object threshold: {0}")]
    InvalidLargeMinSize(String),

    #[error("Invalid free chunk minimum: {0}")]
    InvalidFreeChunkMinSize(String),
}
