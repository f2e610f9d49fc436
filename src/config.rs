//! Cache Configuration Module
//!
//! This module provides the configuration structure for [`LocklessCache`](crate::LocklessCache).
//!
//! # Design Philosophy
//!
//! The configuration struct has all public fields for simple instantiation:
//!
//! - **Simple**: Just create the struct with all fields set
//! - **Type safety**: All parameters must be provided at construction
//! - **No boilerplate**: `LocklessCacheConfig::new` fills in the usual defaults
//!
//! Validation happens once, when the cache is created. An invalid configuration is a
//! programming error and panics, because the cache has no partially-initialized state.
//!
//! # Sizing Guidelines
//!
//! Every slot is a single 32-bit word, so the memory footprint is exactly
//! `capacity * 4` bytes plus a small control structure:
//!
//! ```text
//! Total Memory ≈ capacity × 4 bytes
//! Neighborhood  = line_size / 4 slots (16 slots for a 64-byte line)
//! ```
//!
//! **Example**: a cache for ~4M node identifiers:
//! - `capacity = 1 << 22` slots
//! - memory = 16MB
//!
//! # Examples
//!
//! ```
//! use lockless_cache::config::{LocklessCacheConfig, Placement};
//! use lockless_cache::LocklessCache;
//! use core::num::NonZeroUsize;
//!
//! let config = LocklessCacheConfig {
//!     capacity: NonZeroUsize::new(1 << 16).unwrap(),
//!     line_size: 64,
//!     placement: Placement::Aligned,
//! };
//! let cache: LocklessCache = LocklessCache::init(config, None);
//! assert_eq!(cache.neighborhood_size(), 16);
//! ```

use core::fmt;
use core::num::NonZeroUsize;

/// Assumed size of a hardware cache line in bytes.
pub const DEFAULT_LINE_SIZE: usize = 64;

/// Width of a single slot in bytes.
pub const SLOT_SIZE: usize = core::mem::size_of::<u32>();

/// Largest supported line size. Interleaved placement maps whole pages, so a
/// line may never be larger than the smallest page.
pub const MAX_LINE_SIZE: usize = 4096;

/// Where the slot array lives in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// One allocation from the global allocator, aligned to the line size.
    #[default]
    Aligned,
    /// Pages distributed round-robin across all online NUMA nodes.
    ///
    /// Requires the `numa` feature on Linux. Elsewhere the cache falls back to
    /// [`Placement::Aligned`] and logs a warning.
    Interleaved,
}

impl Placement {
    /// Short name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Aligned => "aligned",
            Placement::Interleaved => "interleaved",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`LocklessCache`](crate::LocklessCache).
///
/// # Fields
///
/// - `capacity`: Number of 32-bit slots. Must be a power of two and hold at
///   least one neighborhood (`line_size / 4` slots).
/// - `line_size`: Cache line size in bytes. Determines the neighborhood size and
///   the alignment of the slot array. Power of two, multiple of 4, at most 4096.
/// - `placement`: Memory placement strategy for the slot array.
///
/// # Examples
///
/// ```
/// use lockless_cache::config::LocklessCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = LocklessCacheConfig::new(NonZeroUsize::new(1024).unwrap());
/// assert_eq!(config.neighborhood_size(), 16);
/// assert!(config.validate().is_ok());
///
/// let bad = LocklessCacheConfig::new(NonZeroUsize::new(1000).unwrap());
/// assert!(bad.validate().is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LocklessCacheConfig {
    /// Total number of slots. Must be a power of two, at least one neighborhood.
    pub capacity: NonZeroUsize,
    /// Cache line size in bytes.
    pub line_size: usize,
    /// Memory placement strategy for the slot array.
    pub placement: Placement,
}

impl LocklessCacheConfig {
    /// Creates a configuration with the default 64-byte line and aligned placement.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            line_size: DEFAULT_LINE_SIZE,
            placement: Placement::Aligned,
        }
    }

    /// Sets the cache line size in bytes.
    #[must_use]
    pub fn with_line_size(mut self, line_size: usize) -> Self {
        self.line_size = line_size;
        self
    }

    /// Sets the placement strategy.
    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Number of slots sharing one cache line.
    #[inline]
    pub fn neighborhood_size(&self) -> usize {
        self.line_size / SLOT_SIZE
    }

    /// Checks every precondition the cache relies on.
    ///
    /// Returns a static description of the first violated rule.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.line_size.is_power_of_two() || self.line_size < SLOT_SIZE {
            return Err("line size must be a power of two of at least 4 bytes");
        }
        if self.line_size > MAX_LINE_SIZE {
            return Err("line size must not exceed 4096 bytes");
        }
        if !self.capacity.get().is_power_of_two() {
            return Err("capacity must be a power of two");
        }
        if self.capacity.get() < self.neighborhood_size() {
            return Err("capacity must hold at least one neighborhood");
        }
        if u32::try_from(self.capacity.get() - 1).is_err() {
            return Err("capacity must be addressable by a 32-bit hash");
        }
        Ok(())
    }
}

impl fmt::Debug for LocklessCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocklessCacheConfig")
            .field("capacity", &self.capacity)
            .field("line_size", &self.line_size)
            .field("placement", &self.placement)
            .finish()
    }
}
