//! Stress Tests for the Lock-free Cache
//!
//! These tests verify thread safety and correctness under high contention:
//! duplicate suppression, conservation of payloads across evictions and
//! exactly-once release when clears race with inserts.

use lockless_cache::{LocklessCache, PutOutcome, EMPTY};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const NUM_THREADS: usize = 16;
const OPS_PER_THREAD: usize = 10_000;

fn occupied(cache: &LocklessCache) -> Vec<u32> {
    (0..cache.capacity())
        .map(|index| cache.slot(index))
        .filter(|&payload| payload != EMPTY)
        .collect()
}

/// Every thread inserts the same small key set; each payload must be stored
/// exactly once and no slot may ever hold a duplicate.
#[test]
fn stress_same_payloads_high_contention() {
    let cache = Arc::new(LocklessCache::new(1 << 12));
    let inserted = Arc::new(AtomicUsize::new(0));
    let evicted = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let inserted = Arc::clone(&inserted);
            let evicted = Arc::clone(&evicted);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for payload in 1..=256u32 {
                    let outcome = cache.put(payload);
                    if outcome.is_inserted() {
                        inserted.fetch_add(1, Ordering::Relaxed);
                    }
                    if outcome.evicted().is_some() {
                        evicted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let slots = occupied(&cache);
    let unique: HashSet<u32> = slots.iter().copied().collect();
    assert_eq!(unique.len(), slots.len(), "duplicate payload in the table");
    assert_eq!(
        inserted.load(Ordering::Relaxed) - evicted.load(Ordering::Relaxed),
        slots.len()
    );
}

/// All threads target one neighborhood with overlapping payloads. Every
/// payload that went in either is still cached or came back as an eviction.
#[test]
fn stress_single_neighborhood_conservation() {
    let cache = Arc::new(LocklessCache::new(64));
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut inserted: HashMap<u32, usize> = HashMap::new();
                let mut evicted: HashMap<u32, usize> = HashMap::new();
                barrier.wait();
                for i in 0..OPS_PER_THREAD {
                    let payload = ((t * 7 + i) % 48) as u32 + 1;
                    match cache.put_with_hash(payload, 35) {
                        PutOutcome::Found => {}
                        PutOutcome::InsertedEmpty => *inserted.entry(payload).or_default() += 1,
                        PutOutcome::InsertedEvicted(old) => {
                            *inserted.entry(payload).or_default() += 1;
                            *evicted.entry(old).or_default() += 1;
                        }
                    }
                }
                (inserted, evicted)
            })
        })
        .collect();

    let mut inserted: HashMap<u32, usize> = HashMap::new();
    let mut evicted: HashMap<u32, usize> = HashMap::new();
    for handle in handles {
        let (ins, ev) = handle.join().unwrap();
        for (payload, count) in ins {
            *inserted.entry(payload).or_default() += count;
        }
        for (payload, count) in ev {
            *evicted.entry(payload).or_default() += count;
        }
    }

    let resident = occupied(&cache);
    assert!(resident.len() <= 16);
    for index in (0..32).chain(48..64) {
        assert_eq!(cache.slot(index), EMPTY);
    }

    // Per payload: insertions == evictions + copies still resident.
    for payload in 1..=48u32 {
        let ins = inserted.get(&payload).copied().unwrap_or(0);
        let ev = evicted.get(&payload).copied().unwrap_or(0);
        let res = resident.iter().filter(|&&p| p == payload).count();
        assert_eq!(ins, ev + res, "payload {payload} was lost or duplicated");
    }
}

/// Threads insert while another thread repeatedly clears; every payload that
/// leaves the table through a clear is released exactly once.
#[test]
fn stress_clear_races_with_put() {
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&released);
    let cache = Arc::new(
        LocklessCache::new(1 << 10).with_release(move |payload: u32| sink.lock().push(payload)),
    );
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..NUM_THREADS as u32)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut inserted = Vec::new();
                let mut evicted = Vec::new();
                for i in 0..OPS_PER_THREAD as u32 {
                    // Disjoint payloads per thread so every insert is unique.
                    let payload = t * OPS_PER_THREAD as u32 + i + 1;
                    match cache.put(payload) {
                        PutOutcome::Found => panic!("payload {payload} was never inserted before"),
                        PutOutcome::InsertedEmpty => inserted.push(payload),
                        PutOutcome::InsertedEvicted(old) => {
                            inserted.push(payload);
                            evicted.push(old);
                        }
                    }
                }
                (inserted, evicted)
            })
        })
        .collect();

    let clearer = {
        let cache = Arc::clone(&cache);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                cache.clear();
                thread::yield_now();
            }
        })
    };

    let mut inserted = Vec::new();
    let mut evicted = Vec::new();
    for handle in writers {
        let (ins, ev) = handle.join().unwrap();
        inserted.extend(ins);
        evicted.extend(ev);
    }
    done.store(true, Ordering::Release);
    clearer.join().unwrap();

    let resident = occupied(&cache);
    let released = released.lock().clone();

    let mut accounted: Vec<u32> = released;
    accounted.extend(&evicted);
    accounted.extend(&resident);
    accounted.sort_unstable();
    inserted.sort_unstable();
    assert_eq!(accounted, inserted, "a payload was lost or released twice");
}

/// Two clearers sweep the same table at once; each payload is released by
/// exactly one of them.
#[test]
fn stress_concurrent_clears_release_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let cache = Arc::new(LocklessCache::new(1 << 14).with_release(move |_payload: u32| {
        counter.fetch_add(1, Ordering::Relaxed);
    }));
    for payload in 1..=8000u32 {
        cache.put(payload);
    }
    let resident = cache.len();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.clear();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(count.load(Ordering::Relaxed), resident);
    assert!(cache.is_empty());
}

/// Mixed put/contains traffic from many threads; found lookups always refer
/// to payloads that were inserted.
#[test]
fn stress_mixed_put_contains() {
    let cache = Arc::new(LocklessCache::new(1 << 8));
    let handles: Vec<_> = (0..NUM_THREADS as u32)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD as u32 {
                    let payload = (t * 31 + i) % 2000 + 1;
                    if i % 3 == 0 {
                        let _ = cache.contains(payload);
                    } else {
                        cache.put(payload);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let slots = occupied(&cache);
    assert!(slots.len() <= cache.capacity());
    assert!(slots.iter().all(|&payload| (1..=2000).contains(&payload)));
}

#[cfg(feature = "stats")]
#[test]
fn stress_stats_agree_with_outcomes() {
    let cache = Arc::new(LocklessCache::new(1 << 9));
    let handles: Vec<_> = (0..NUM_THREADS as u32)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut tally = [0u64; 3];
                for i in 0..OPS_PER_THREAD as u32 {
                    let payload = (t + i * 13) % 4096 + 1;
                    match cache.put(payload) {
                        PutOutcome::Found => tally[0] += 1,
                        PutOutcome::InsertedEmpty => tally[1] += 1,
                        PutOutcome::InsertedEvicted(_) => tally[2] += 1,
                    }
                }
                tally
            })
        })
        .collect();

    let mut totals = [0u64; 3];
    for handle in handles {
        let tally = handle.join().unwrap();
        for (total, n) in totals.iter_mut().zip(tally) {
            *total += n;
        }
    }

    let stats = cache.stats();
    assert_eq!(stats.found, totals[0]);
    assert_eq!(stats.inserted_empty, totals[1]);
    assert_eq!(stats.inserted_evicted, totals[2]);
    assert_eq!(stats.puts(), (NUM_THREADS * OPS_PER_THREAD) as u64);
    // Without clears, only inserts into empty slots change occupancy.
    assert_eq!(stats.inserted_empty, cache.len() as u64);
}
