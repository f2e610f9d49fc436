//! Concurrent Cache Usage Example
//!
//! Several worker threads share one cache the way decision-diagram workers
//! share an operation cache: each derives payloads, inserts them, and drops
//! its own reference to anything the cache hands back as evicted. A
//! maintenance thread periodically clears the table; the release callback
//! accounts for every payload the clear removes.
//!
//! Run with: cargo run --example concurrent_usage

use lockless_cache::config::{LocklessCacheConfig, Placement};
use lockless_cache::{LocklessCache, PutOutcome};
use log::info;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WORKERS: u32 = 8;
const OPS_PER_WORKER: u32 = 200_000;

#[derive(Default)]
struct Tally {
    found: u64,
    inserted: u64,
    evicted: u64,
}

fn main() {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    let released = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&released);

    let config = LocklessCacheConfig::new(NonZeroUsize::new(1 << 16).unwrap())
        .with_placement(Placement::Interleaved);
    let cache: LocklessCache = LocklessCache::init(config, None);
    let cache = Arc::new(cache.with_release(move |_payload: u32| {
        counter.fetch_add(1, Ordering::Relaxed);
    }));
    info!("cache ready: {}", cache.describe_size());

    let stop = Arc::new(AtomicBool::new(false));
    let maintenance = {
        let cache = Arc::clone(&cache);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut sweeps = 0u32;
            while !stop.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(5));
                cache.clear();
                sweeps += 1;
            }
            sweeps
        })
    };

    let start = Instant::now();
    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut tally = Tally::default();
                for i in 0..OPS_PER_WORKER {
                    // Overlapping ranges so workers regularly see each other's payloads.
                    let payload = (worker * 10_007 + i) % 150_000 + 1;
                    match cache.put(payload) {
                        PutOutcome::Found => tally.found += 1,
                        PutOutcome::InsertedEmpty => tally.inserted += 1,
                        PutOutcome::InsertedEvicted(_old) => {
                            tally.inserted += 1;
                            tally.evicted += 1;
                        }
                    }
                }
                tally
            })
        })
        .collect();

    let mut total = Tally::default();
    for handle in workers {
        let tally = handle.join().unwrap();
        total.found += tally.found;
        total.inserted += tally.inserted;
        total.evicted += tally.evicted;
    }
    let elapsed = start.elapsed();

    stop.store(true, Ordering::Release);
    let sweeps = maintenance.join().unwrap();

    let ops = u64::from(WORKERS) * u64::from(OPS_PER_WORKER);
    info!(
        "{} puts in {:.2?} ({:.1} Mops/s)",
        ops,
        elapsed,
        ops as f64 / elapsed.as_secs_f64() / 1e6
    );
    info!(
        "found {}, inserted {}, evicted {}",
        total.found, total.inserted, total.evicted
    );
    info!(
        "{} clears released {} payloads, {} still resident",
        sweeps,
        released.load(Ordering::Relaxed),
        cache.len()
    );

    let inserted = total.inserted;
    let accounted = total.evicted + released.load(Ordering::Relaxed) + cache.len() as u64;
    assert_eq!(inserted, accounted, "every inserted payload is accounted for");

    match Arc::try_unwrap(cache) {
        Ok(cache) => cache.destroy(),
        Err(_) => unreachable!("all threads joined"),
    }
}
