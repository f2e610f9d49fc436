//! Cache Metrics System
//!
//! Provides counters for the lock-free cache and a uniform reporting trait.
//! Counters are plain relaxed atomics updated on the operation paths; a
//! [`MetricsSnapshot`] copies them out for reporting and derives rates.
//!
//! Reports are `BTreeMap`s so keys always come out in the same order.
//!
//! The whole module is compiled only with the `stats` feature.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

pub mod lockless;

pub use lockless::LocklessCacheMetrics;

/// Point-in-time copy of the cache counters.
///
/// Counters are read one by one with relaxed loads, so a snapshot taken while
/// other threads are running is approximate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// `put` calls that found the payload already present.
    pub found: u64,

    /// `put` calls that stored the payload in an empty slot.
    pub inserted_empty: u64,

    /// `put` calls that traded the payload for an existing occupant.
    pub inserted_evicted: u64,

    /// Failed compare-and-swap attempts that had to be retried.
    pub cas_retries: u64,

    /// Slots swept by `clear`/`clear_range`, whether they held a payload or not.
    pub slots_swept: u64,

    /// Payloads handed to the release capability.
    pub released: u64,
}

impl MetricsSnapshot {
    /// Total number of `put` calls.
    pub fn puts(&self) -> u64 {
        self.found + self.inserted_empty + self.inserted_evicted
    }

    /// Total number of `put` calls that stored their payload.
    pub fn insertions(&self) -> u64 {
        self.inserted_empty + self.inserted_evicted
    }

    /// Fraction of puts whose payload was already cached.
    ///
    /// # Returns
    /// A value between 0.0 and 1.0, or 0.0 if no puts have been made
    pub fn hit_rate(&self) -> f64 {
        let puts = self.puts();
        if puts > 0 {
            self.found as f64 / puts as f64
        } else {
            0.0
        }
    }

    /// Fraction of insertions that had to evict an occupant.
    ///
    /// # Returns
    /// A value between 0.0 and 1.0, or 0.0 if nothing was inserted
    pub fn eviction_rate(&self) -> f64 {
        let insertions = self.insertions();
        if insertions > 0 {
            self.inserted_evicted as f64 / insertions as f64
        } else {
            0.0
        }
    }

    /// Convert the snapshot to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        // Counters
        metrics.insert("cas_retries".to_string(), self.cas_retries as f64);
        metrics.insert("slots_swept".to_string(), self.slots_swept as f64);
        metrics.insert("found".to_string(), self.found as f64);
        metrics.insert("inserted_empty".to_string(), self.inserted_empty as f64);
        metrics.insert("inserted_evicted".to_string(), self.inserted_evicted as f64);
        metrics.insert("released".to_string(), self.released as f64);
        metrics.insert("puts".to_string(), self.puts() as f64);

        // Rates (0.0 to 1.0)
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("eviction_rate".to_string(), self.eviction_rate());

        metrics
    }
}

/// Uniform metrics reporting.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Algorithm name for identification
    fn algorithm_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_empty_snapshot_rates() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.puts(), 0);
        assert_eq!(snapshot.hit_rate(), 0.0);
        assert_eq!(snapshot.eviction_rate(), 0.0);
    }

    #[test]
    fn test_snapshot_rates() {
        let snapshot = MetricsSnapshot {
            found: 6,
            inserted_empty: 3,
            inserted_evicted: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.puts(), 10);
        assert_eq!(snapshot.insertions(), 4);
        assert!((snapshot.hit_rate() - 0.6).abs() < 1e-12);
        assert!((snapshot.eviction_rate() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_btreemap_keys_are_sorted() {
        let map = MetricsSnapshot::default().to_btreemap();
        let keys: alloc::vec::Vec<&str> = map.keys().map(String::as_str).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert!(map.contains_key("hit_rate"));
        assert!(map.contains_key("cas_retries"));
    }
}
