//! Cache Metrics Demonstration
//!
//! Runs three workloads against caches of different sizes and prints the
//! counters gathered by the `stats` feature: how often a payload was already
//! cached, how often it found an empty slot, and how often it had to evict.
//!
//! Run with: cargo run --example metrics_demo

use lockless_cache::metrics::CacheMetrics;
use lockless_cache::LocklessCache;
use log::info;
use std::collections::BTreeMap;

fn main() {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    let runs: Vec<(&str, LocklessCache)> = vec![
        ("repeat hot set", repeat_hot_set()),
        ("sequential scan", sequential_scan()),
        ("undersized table", undersized_table()),
    ];

    for (name, cache) in &runs {
        display_metrics(name, cache);
    }
}

/// A small working set re-inserted many times: almost every put is found.
fn repeat_hot_set() -> LocklessCache {
    let cache = LocklessCache::new(1 << 12);
    for _ in 0..50 {
        for payload in 1..=500u32 {
            cache.put(payload);
        }
    }
    cache
}

/// Every payload is new, and the table is large enough to hold them.
fn sequential_scan() -> LocklessCache {
    let cache = LocklessCache::new(1 << 16);
    for payload in 1..=20_000u32 {
        cache.put(payload);
    }
    cache
}

/// Far more distinct payloads than slots: evictions dominate, and a final
/// clear sweeps the table.
fn undersized_table() -> LocklessCache {
    let cache = LocklessCache::new(1 << 10);
    for payload in 1..=50_000u32 {
        cache.put(payload);
    }
    cache.clear();
    cache
}

fn display_metrics(name: &str, cache: &LocklessCache) {
    let metrics: BTreeMap<String, f64> = cache.metrics();
    info!("{} ({}, {})", name, cache.algorithm_name(), cache.describe_size());
    for (key, value) in &metrics {
        info!("  {:<18} {:>12.3}", key, value);
    }
    let stats = cache.stats();
    info!(
        "  hit rate {:.1}%, eviction rate {:.1}%",
        stats.hit_rate() * 100.0,
        stats.eviction_rate() * 100.0
    );
}
