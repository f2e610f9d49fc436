//! Release notification for cleared payloads.
//!
//! A cache can be given a [`Release`] capability at construction. Every
//! payload removed by [`clear`](crate::LocklessCache::clear) or
//! [`clear_range`](crate::LocklessCache::clear_range) is handed to it exactly
//! once, so the owner can drop whatever external resource the payload refers
//! to (a node reference count, a computed-table entry, ...).
//!
//! Evictions performed by `put` do **not** go through this capability; the
//! evicted payload is returned to the caller in
//! [`PutOutcome::InsertedEvicted`](crate::PutOutcome::InsertedEvicted).
//!
//! Any `Fn(u32) + Send + Sync` closure is a `Release`; the closure's captures
//! play the role of the callback context.
//!
//! ```
//! use lockless_cache::LocklessCache;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let released = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&released);
//! let cache = LocklessCache::new(64).with_release(move |_payload: u32| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! cache.put(7);
//! cache.put(8);
//! cache.clear();
//! assert_eq!(released.load(Ordering::Relaxed), 2);
//! ```

/// Receives payloads removed from the cache by a clear.
///
/// Called concurrently from every thread that clears, so implementations must
/// be thread-safe and should be cheap.
pub trait Release: Send + Sync {
    /// Called once for every non-empty slot a clear empties.
    fn release(&self, payload: u32);
}

impl<F> Release for F
where
    F: Fn(u32) + Send + Sync,
{
    #[inline]
    fn release(&self, payload: u32) {
        self(payload)
    }
}
