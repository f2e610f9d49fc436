//! Lock-free Set Cache Implementation
//!
//! This module provides [`LocklessCache`], a fixed-capacity set of non-zero
//! 32-bit payloads that any number of threads can insert into without locks.
//! It is meant to sit underneath an engine that hashes node or operation
//! identifiers into a bounded table and tolerates losing old entries.
//!
//! # Algorithm
//!
//! Each slot is one `AtomicU32`; `0` means empty. A payload's hash selects a
//! *home* slot, and the probe walks the home's cache line (its
//! [`Neighborhood`]) exactly once:
//!
//! 1. an empty slot is claimed with a single compare-and-swap; if another
//!    thread wins the race, the same slot is re-examined because the winner
//!    may have stored this very payload;
//! 2. a slot already holding the payload ends the walk with
//!    [`PutOutcome::Found`];
//! 3. if the whole line is occupied by other payloads, the home slot is
//!    traded: its current occupant is swapped out and returned to the caller
//!    as [`PutOutcome::InsertedEvicted`].
//!
//! ```text
//!  put(p, hash)
//!      │
//!      ▼
//!  home = hash & mask ──▶ walk line ──▶ empty? ──CAS ok──▶ InsertedEmpty
//!                            │            │
//!                            │            └─CAS lost──▶ re-read same slot
//!                            ├─ == p ─────────────────▶ Found
//!                            ▼
//!                       line full ──▶ CAS(home, v, p) ──▶ InsertedEvicted(v)
//! ```
//!
//! # Performance Characteristics
//!
//! - **put**: O(neighborhood) loads, at most one successful CAS, one cache line
//! - **clear_range**: O(count)
//! - **Memory**: exactly `capacity * 4` bytes of slots
//!
//! # Thread Safety
//!
//! `put`, `contains`, `clear` and `clear_range` take `&self` and may run
//! concurrently from any number of threads. Every mutation is a single-word
//! atomic; there is no cross-slot atomicity. Destruction takes `self` by value,
//! so it cannot overlap with any other operation.

extern crate alloc;

use crate::config::{LocklessCacheConfig, Placement, SLOT_SIZE};
use crate::neighborhood::Neighborhood;
use crate::release::Release;
use crate::storage::{SlotAllocator, SlotTable};
use crate::DefaultHashBuilder;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use core::fmt;
use core::hash::BuildHasher;
use core::hint::spin_loop;
use core::num::NonZeroUsize;
use core::sync::atomic::Ordering;
use log::{debug, trace};

#[cfg(feature = "stats")]
use crate::metrics::{CacheMetrics, LocklessCacheMetrics, MetricsSnapshot};
#[cfg(feature = "stats")]
use alloc::collections::BTreeMap;

/// Value of an empty slot. Never a valid payload.
pub const EMPTY: u32 = 0;

/// Result of [`LocklessCache::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutOutcome {
    /// The payload was already cached; nothing changed.
    Found,
    /// The payload was stored in a previously empty slot.
    InsertedEmpty,
    /// The neighborhood was full; the payload replaced the carried occupant,
    /// which is no longer cached and must be released by the caller.
    InsertedEvicted(u32),
}

impl PutOutcome {
    /// `true` if the payload was already present.
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, PutOutcome::Found)
    }

    /// `true` if this call stored the payload.
    #[inline]
    pub fn is_inserted(&self) -> bool {
        !self.is_found()
    }

    /// The payload displaced by this call, if any.
    #[inline]
    pub fn evicted(&self) -> Option<u32> {
        match self {
            PutOutcome::InsertedEvicted(old) => Some(*old),
            _ => None,
        }
    }
}

/// Maps a hash to a value usable for addressing; `0` is reserved.
#[inline]
fn remap_hash(hash: u32) -> u32 {
    if hash == 0 {
        1
    } else {
        hash
    }
}

/// A fixed-capacity, lock-free set of 32-bit payloads.
///
/// See the [module documentation](self) for the algorithm.
///
/// # Type Parameters
///
/// - `S`: Hash builder used to derive a hash when the caller does not supply
///   one. Only the low 32 bits of the 64-bit hash are used.
///
/// # Example
///
/// ```
/// use lockless_cache::{LocklessCache, PutOutcome};
///
/// let cache = LocklessCache::new(1024);
/// assert_eq!(cache.put(42), PutOutcome::InsertedEmpty);
/// assert_eq!(cache.put(42), PutOutcome::Found);
/// assert!(cache.contains(42));
/// assert_eq!(cache.describe_size(), "4 * 1024 = 4096 bytes");
/// ```
pub struct LocklessCache<S = DefaultHashBuilder> {
    table: SlotTable,
    mask: u32,
    neighborhood: Neighborhood,
    config: LocklessCacheConfig,
    hash_builder: S,
    release: Option<Box<dyn Release>>,
    #[cfg(feature = "stats")]
    metrics: LocklessCacheMetrics,
}

impl LocklessCache<DefaultHashBuilder> {
    /// Creates a cache with `capacity` slots, 64-byte neighborhoods and aligned placement.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two or smaller than one neighborhood.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).expect("capacity must be non-zero");
        Self::init(LocklessCacheConfig::new(capacity), None)
    }

    /// Creates a cache from a configuration with an optional hasher.
    ///
    /// This is the **recommended** way to create a cache.
    ///
    /// # Arguments
    ///
    /// * `config` - Capacity, line size and placement
    /// * `hasher` - Optional hash builder. If `None`, uses `DefaultHashBuilder`
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see [`LocklessCacheConfig::validate`]).
    pub fn init(config: LocklessCacheConfig, hasher: Option<DefaultHashBuilder>) -> Self {
        Self::init_with_hasher(config, hasher.unwrap_or_default())
    }
}

impl<S: BuildHasher> LocklessCache<S> {
    /// Creates a cache with a custom hash builder.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn init_with_hasher(config: LocklessCacheConfig, hash_builder: S) -> Self {
        let allocator = config.placement.allocator();
        Self::with_allocator(config, hash_builder, allocator)
    }

    /// Creates a cache whose slots come from `allocator`.
    ///
    /// `config.placement` is recorded for diagnostics only; the allocator
    /// decides where the memory actually lives.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn with_allocator(
        config: LocklessCacheConfig,
        hash_builder: S,
        allocator: Box<dyn SlotAllocator>,
    ) -> Self {
        if let Err(reason) = config.validate() {
            panic!("invalid cache configuration {config:?}: {reason}");
        }
        let capacity = config.capacity.get();
        let mask = u32::try_from(capacity - 1).expect("validated capacity fits in u32");
        let table = SlotTable::new(capacity, config.line_size, allocator);
        debug!(
            "created lockless cache: {} slots, {} per neighborhood, {} placement ({} allocator), {} bytes",
            capacity,
            config.neighborhood_size(),
            config.placement,
            table.allocator_name(),
            capacity * SLOT_SIZE
        );

        LocklessCache {
            table,
            mask,
            neighborhood: Neighborhood::new(config.neighborhood_size()),
            config,
            hash_builder,
            release: None,
            #[cfg(feature = "stats")]
            metrics: LocklessCacheMetrics::new(),
        }
    }

    /// Installs the capability notified for every payload removed by a clear.
    ///
    /// Without one, cleared payloads are dropped silently.
    #[must_use]
    pub fn with_release<R: Release + 'static>(mut self, release: R) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// `capacity - 1`; hashes are reduced with this mask.
    #[inline]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Number of slots one probe may visit.
    #[inline]
    pub fn neighborhood_size(&self) -> usize {
        self.neighborhood.slots()
    }

    /// Requested placement of the slot array.
    #[inline]
    pub fn placement(&self) -> Placement {
        self.config.placement
    }

    /// The configuration the cache was built from.
    #[inline]
    pub fn config(&self) -> &LocklessCacheConfig {
        &self.config
    }

    /// Bytes occupied by the slot array.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.capacity() * SLOT_SIZE
    }

    /// Human-readable size, e.g. `"4 * 1024 = 4096 bytes"`.
    pub fn describe_size(&self) -> String {
        format!(
            "{} * {} = {} bytes",
            SLOT_SIZE,
            self.capacity(),
            self.size_in_bytes()
        )
    }

    /// Current value of slot `index` (`0` when empty).
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub fn slot(&self, index: usize) -> u32 {
        self.table[index].load(Ordering::Acquire)
    }

    /// Number of occupied slots.
    ///
    /// The count is a scan, not a snapshot: concurrent writers may change
    /// slots while it runs.
    pub fn len(&self) -> usize {
        self.table
            .iter()
            .filter(|slot| slot.load(Ordering::Relaxed) != EMPTY)
            .count()
    }

    /// `true` if no slot holds a payload.
    pub fn is_empty(&self) -> bool {
        self.table
            .iter()
            .all(|slot| slot.load(Ordering::Relaxed) == EMPTY)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn derive_hash(&self, payload: u32) -> u32 {
        // Low 32 bits of the 64-bit hash.
        self.hash_builder.hash_one(payload) as u32
    }

    #[inline]
    fn home(&self, hash: u32) -> usize {
        (remap_hash(hash) & self.mask) as usize
    }

    /// Inserts `payload`, deriving its hash with the cache's hash builder.
    ///
    /// The default builder is randomly seeded per cache, so the same payload
    /// lands in different neighborhoods in different caches and runs. Use
    /// [`init_with_hasher`](Self::init_with_hasher) with a fixed-seed builder,
    /// or [`put_with_hash`](Self::put_with_hash), when placement must be
    /// reproducible.
    ///
    /// # Contract
    ///
    /// `payload` must not be `0`; zero marks empty slots. This is checked in
    /// debug builds only.
    #[inline]
    pub fn put(&self, payload: u32) -> PutOutcome {
        let hash = self.derive_hash(payload);
        self.put_with_hash(payload, hash)
    }

    /// Inserts `payload` into the neighborhood selected by `hash`.
    ///
    /// A `hash` of `0` is treated as `1`. All puts of one payload must use the
    /// same hash, otherwise duplicate detection cannot see earlier copies.
    ///
    /// # Returns
    ///
    /// - [`PutOutcome::Found`] if the payload is already in its neighborhood
    /// - [`PutOutcome::InsertedEmpty`] if it was stored in an empty slot
    /// - [`PutOutcome::InsertedEvicted`] carrying the occupant of the home slot
    ///   it replaced when the neighborhood was full
    pub fn put_with_hash(&self, payload: u32, hash: u32) -> PutOutcome {
        debug_assert_ne!(payload, EMPTY, "payload 0 is reserved for empty slots");
        let home = self.home(hash);

        for index in self.neighborhood.walk(home) {
            let slot = &self.table[index];
            let mut current = slot.load(Ordering::Acquire);
            loop {
                if current == payload {
                    return self.found();
                }
                if current != EMPTY {
                    break;
                }
                match slot.compare_exchange(EMPTY, payload, Ordering::AcqRel, Ordering::Acquire) {
                    Ok(_) => {
                        #[cfg(feature = "stats")]
                        self.metrics.record_inserted_empty();
                        return PutOutcome::InsertedEmpty;
                    }
                    // Someone filled the slot first; it may be our payload.
                    Err(actual) => current = self.contended(actual),
                }
            }
        }

        self.trade_home(home, payload)
    }

    /// Swaps `payload` into the home slot of a full neighborhood.
    fn trade_home(&self, home: usize, payload: u32) -> PutOutcome {
        let slot = &self.table[home];
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if current == payload {
                return self.found();
            }
            match slot.compare_exchange_weak(current, payload, Ordering::AcqRel, Ordering::Acquire)
            {
                // A concurrent clear emptied the slot after the walk.
                Ok(EMPTY) => {
                    #[cfg(feature = "stats")]
                    self.metrics.record_inserted_empty();
                    return PutOutcome::InsertedEmpty;
                }
                Ok(evicted) => {
                    #[cfg(feature = "stats")]
                    self.metrics.record_inserted_evicted();
                    return PutOutcome::InsertedEvicted(evicted);
                }
                Err(actual) => current = self.contended(actual),
            }
        }
    }

    #[inline]
    fn found(&self) -> PutOutcome {
        #[cfg(feature = "stats")]
        self.metrics.record_found();
        PutOutcome::Found
    }

    /// Bookkeeping after a lost compare-and-swap; returns the value to retry with.
    #[inline]
    fn contended(&self, actual: u32) -> u32 {
        #[cfg(feature = "stats")]
        self.metrics.record_cas_retry();
        spin_loop();
        actual
    }

    /// `true` if `payload` is currently stored in its neighborhood.
    ///
    /// Uses the hash builder, like [`put`](Self::put).
    pub fn contains(&self, payload: u32) -> bool {
        let hash = self.derive_hash(payload);
        self.contains_with_hash(payload, hash)
    }

    /// `true` if `payload` is currently stored in the neighborhood selected by `hash`.
    ///
    /// Read-only; the answer may be stale as soon as it is returned.
    pub fn contains_with_hash(&self, payload: u32, hash: u32) -> bool {
        payload != EMPTY
            && self
                .neighborhood
                .walk(self.home(hash))
                .any(|index| self.table[index].load(Ordering::Acquire) == payload)
    }

    /// Empties every slot. Equivalent to `clear_range(0, capacity)`.
    pub fn clear(&self) {
        trace!("clearing all {} slots", self.capacity());
        self.clear_range(0, self.capacity());
    }

    /// Empties `count` slots starting at `first`.
    ///
    /// Without a release capability each slot is simply stored `0`; a `put`
    /// racing on the same range may lose its payload silently.
    ///
    /// With a release capability every slot is emptied by compare-and-swap and
    /// the removed payload is released exactly once. Payloads inserted while
    /// the clear is running may or may not be caught: whatever a slot holds
    /// when the sweep reaches it is what gets released.
    ///
    /// # Panics
    ///
    /// Panics if `first + count > capacity`.
    pub fn clear_range(&self, first: usize, count: usize) {
        let end = first
            .checked_add(count)
            .filter(|&end| end <= self.capacity())
            .unwrap_or_else(|| {
                panic!(
                    "clear range {first}+{count} exceeds capacity {}",
                    self.capacity()
                )
            });
        let slots = &self.table[first..end];

        match &self.release {
            None => {
                for slot in slots {
                    slot.store(EMPTY, Ordering::Release);
                }
            }
            Some(release) => {
                for slot in slots {
                    let mut current = slot.load(Ordering::Acquire);
                    while current != EMPTY {
                        match slot.compare_exchange_weak(
                            current,
                            EMPTY,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        ) {
                            Ok(_) => {
                                release.release(current);
                                #[cfg(feature = "stats")]
                                self.metrics.record_released();
                                break;
                            }
                            Err(actual) => current = self.contended(actual),
                        }
                    }
                }
            }
        }

        #[cfg(feature = "stats")]
        self.metrics.record_swept(count as u64);
    }

    /// Releases the slot array.
    ///
    /// Payloads still in the table are **not** passed to the release
    /// capability; call [`clear`](Self::clear) first if the owner needs them.
    /// Dropping the cache has the same effect.
    pub fn destroy(self) {
        debug!(
            "destroying lockless cache: {} ({} allocator)",
            self.describe_size(),
            self.table.allocator_name()
        );
        drop(self);
    }
}

#[cfg(feature = "stats")]
impl<S> LocklessCache<S> {
    /// Copies out the operation counters.
    pub fn stats(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zeroes the operation counters.
    pub fn reset_stats(&self) {
        self.metrics.reset();
    }
}

#[cfg(feature = "stats")]
impl<S> CacheMetrics for LocklessCache<S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.snapshot().to_btreemap();
        metrics.insert(String::from("capacity"), self.table.len() as f64);
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "Lockless"
    }
}

impl<S> fmt::Debug for LocklessCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocklessCache")
            .field("capacity", &self.table.len())
            .field("mask", &self.mask)
            .field("neighborhood", &self.neighborhood.slots())
            .field("placement", &self.config.placement)
            .field("table", &self.table)
            .field("release", &self.release.is_some())
            .finish()
    }
}
