//! Lock-free cache counters.

use super::MetricsSnapshot;
use core::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters owned by a [`LocklessCache`](crate::LocklessCache).
///
/// Every update is a single relaxed `fetch_add`; counters are for reporting
/// only and never take part in the cache's synchronization.
///
/// The block is aligned to a cache line so counter traffic does not share a
/// line with the cache's read-mostly fields.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct LocklessCacheMetrics {
    found: AtomicU64,
    inserted_empty: AtomicU64,
    inserted_evicted: AtomicU64,
    cas_retries: AtomicU64,
    slots_swept: AtomicU64,
    released: AtomicU64,
}

impl LocklessCacheMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_inserted_empty(&self) {
        self.inserted_empty.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_inserted_evicted(&self) {
        self.inserted_evicted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cas_retry(&self) {
        self.cas_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_swept(&self, slots: u64) {
        if slots > 0 {
            self.slots_swept.fetch_add(slots, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters out.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            found: self.found.load(Ordering::Relaxed),
            inserted_empty: self.inserted_empty.load(Ordering::Relaxed),
            inserted_evicted: self.inserted_evicted.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
            slots_swept: self.slots_swept.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }

    /// Zeroes all counters.
    pub fn reset(&self) {
        for counter in [
            &self.found,
            &self.inserted_empty,
            &self.inserted_evicted,
            &self.cas_retries,
            &self.slots_swept,
            &self.released,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_counters_round_trip_through_snapshot() {
        let metrics = LocklessCacheMetrics::new();
        metrics.record_found();
        metrics.record_found();
        metrics.record_inserted_empty();
        metrics.record_inserted_evicted();
        metrics.record_cas_retry();
        metrics.record_swept(5);
        metrics.record_swept(0);
        metrics.record_released();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.found, 2);
        assert_eq!(snapshot.inserted_empty, 1);
        assert_eq!(snapshot.inserted_evicted, 1);
        assert_eq!(snapshot.cas_retries, 1);
        assert_eq!(snapshot.slots_swept, 5);
        assert_eq!(snapshot.released, 1);
    }

    #[test]
    fn test_reset() {
        let metrics = LocklessCacheMetrics::new();
        metrics.record_found();
        metrics.record_swept(3);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_own_a_cache_line() {
        assert_eq!(core::mem::align_of::<LocklessCacheMetrics>(), 64);
        assert_eq!(core::mem::size_of::<LocklessCacheMetrics>(), 64);
    }
}
