//! Concurrent Cache Benchmarks
//!
//! Benchmarks for measuring put throughput across thread counts and access
//! patterns: disjoint payloads, a shared hot set, and puts racing a clearer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lockless_cache::LocklessCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const CACHE_SIZE: usize = 1 << 16;
const OPS_PER_THREAD: usize = 1_000;

fn run_threads<F>(cache: &Arc<LocklessCache>, threads: usize, op: F)
where
    F: Fn(&LocklessCache, u32, u32) + Send + Sync + Copy + 'static,
{
    let handles: Vec<_> = (0..threads as u32)
        .map(|t| {
            let cache = Arc::clone(cache);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD as u32 {
                    op(&cache, t, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

/// Each thread inserts its own payloads.
fn concurrent_disjoint_puts(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Disjoint Puts");

    for threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));
        let cache = Arc::new(LocklessCache::new(CACHE_SIZE));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                run_threads(&cache, threads, |cache, t, i| {
                    black_box(cache.put(t * OPS_PER_THREAD as u32 + i + 1));
                });
            });
        });
    }

    group.finish();
}

/// All threads hammer the same small payload set.
fn concurrent_hot_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Hot Set");

    for threads in [1, 2, 4, 8] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));
        let cache = Arc::new(LocklessCache::new(CACHE_SIZE));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                run_threads(&cache, threads, |cache, _t, i| {
                    black_box(cache.put(i % 64 + 1));
                });
            });
        });
    }

    group.finish();
}

/// Puts while a background thread keeps clearing with a release callback.
fn concurrent_put_with_clear(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Put With Clear");

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements((threads * OPS_PER_THREAD) as u64));
        let cache = Arc::new(LocklessCache::new(CACHE_SIZE).with_release(|payload: u32| {
            black_box(payload);
        }));
        let stop = Arc::new(AtomicBool::new(false));
        let clearer = {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    cache.clear();
                }
            })
        };

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                run_threads(&cache, threads, |cache, t, i| {
                    black_box(cache.put((t << 20) | (i + 1)));
                });
            });
        });

        stop.store(true, Ordering::Relaxed);
        clearer.join().unwrap();
    }

    group.finish();
}

criterion_group!(
    benches,
    concurrent_disjoint_puts,
    concurrent_hot_set,
    concurrent_put_with_clear
);
criterion_main!(benches);
