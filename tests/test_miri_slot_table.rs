// Slot table checks meant to run under Miri.
//
// The slot array is a raw allocation viewed as `[AtomicU32]`. These tests
// exercise creation, shared access from several threads, custom allocators
// and teardown so that Miri can check alignment, provenance and frees.
//
// Run with: cargo +nightly miri test --test test_miri_slot_table

#![cfg(test)]

use lockless_cache::config::{LocklessCacheConfig, Placement};
use lockless_cache::{LocklessCache, PutOutcome};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

fn small_cache(line_size: usize) -> LocklessCache {
    let config = LocklessCacheConfig {
        capacity: NonZeroUsize::new(64).unwrap(),
        line_size,
        placement: Placement::Aligned,
    };
    LocklessCache::init(config, None)
}

/// Creating and dropping tables of every line size frees exactly what was allocated.
#[test]
fn test_table_lifecycle_all_line_sizes() {
    for line_size in [4, 8, 16, 32, 64, 128, 256] {
        let cache = small_cache(line_size);
        assert_eq!(cache.put_with_hash(1, 63), PutOutcome::InsertedEmpty);
        assert_eq!(cache.slot(63), 1);
        cache.destroy();
    }
}

/// Slots written by one thread are read through the shared slice by others.
#[test]
fn test_shared_slots_across_threads() {
    let cache = Arc::new(small_cache(64));
    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 1..=8u32 {
                    cache.put_with_hash(t * 100 + i, t * 16);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    for t in 0..4u32 {
        for i in 1..=8u32 {
            assert!(cache.contains_with_hash(t * 100 + i, t * 16));
        }
    }
}

/// A release closure captured by the cache is dropped with it.
#[test]
fn test_release_dropped_with_cache() {
    let token = Arc::new(());
    let held = Arc::clone(&token);
    let cache = small_cache(64).with_release(move |_payload: u32| {
        let _ = &held;
    });
    assert_eq!(Arc::strong_count(&token), 2);
    cache.put(5);
    cache.clear();
    drop(cache);
    assert_eq!(Arc::strong_count(&token), 1);
}
