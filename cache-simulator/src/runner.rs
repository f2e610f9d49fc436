//! Simulation runner for the lockless cache
//!
//! For every configured workload the runner builds a fresh cache, starts the
//! worker threads on a barrier and lets each issue its share of puts. Workers
//! may also clear the whole table periodically; a counting release callback
//! records every payload those clears remove, so the run can check that no
//! payload was lost.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use lockless_cache::config::LocklessCacheConfig;
use lockless_cache::{LocklessCache, PutOutcome};
use log::{debug, info, warn};

use crate::generator::PayloadGenerator;
use crate::models::{OutcomeCounts, RunResult, SimulationConfig, Workload};

/// Per-worker tally
#[derive(Debug, Default)]
struct WorkerReport {
    counts: OutcomeCounts,
    clears: u64,
}

/// Runs each workload of a [`SimulationConfig`] against its own cache
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Validated cache configuration for this run
    fn cache_config(&self) -> Result<LocklessCacheConfig, String> {
        let capacity = NonZeroUsize::new(self.config.capacity)
            .ok_or_else(|| "capacity must be non-zero".to_string())?;
        let config = LocklessCacheConfig::new(capacity)
            .with_line_size(self.config.line_size)
            .with_placement(self.config.placement);
        config.validate().map_err(|reason| format!("{config:?}: {reason}"))?;
        Ok(config)
    }

    /// Run all workloads in order
    pub fn run(&self) -> Result<Vec<RunResult>, String> {
        if self.config.threads == 0 {
            return Err("at least one worker thread is required".to_string());
        }
        if self.config.key_space == 0 {
            return Err("key space must not be empty".to_string());
        }
        let cache_config = self.cache_config()?;

        Ok(self
            .config
            .workloads
            .iter()
            .map(|&workload| self.run_workload(workload, cache_config))
            .collect())
    }

    fn run_workload(&self, workload: Workload, cache_config: LocklessCacheConfig) -> RunResult {
        let released = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&released);
        let cache: LocklessCache = LocklessCache::init(cache_config, None);
        let cache = Arc::new(cache.with_release(move |_payload: u32| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        info!(
            "running {} workload: {} threads x {} puts on {}",
            workload,
            self.config.threads,
            self.config.ops_per_thread,
            cache.describe_size()
        );

        let barrier = Arc::new(Barrier::new(self.config.threads));
        let start = Instant::now();
        let handles: Vec<_> = (0..self.config.threads)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let generator = PayloadGenerator::new(
                    workload,
                    self.config.key_space,
                    self.config.hot_set,
                    self.config.hot_percent,
                    self.config.seed,
                    worker,
                );
                let ops = self.config.ops_per_thread;
                let clear_every = self.config.clear_every;
                thread::spawn(move || {
                    barrier.wait();
                    run_worker(&cache, generator, ops, clear_every)
                })
            })
            .collect();

        let mut counts = OutcomeCounts::default();
        let mut clears = 0;
        for handle in handles {
            match handle.join() {
                Ok(report) => {
                    counts.merge(&report.counts);
                    clears += report.clears;
                }
                Err(_) => warn!("a {workload} worker panicked; its counts are missing"),
            }
        }
        let duration = start.elapsed();

        let stats = cache.stats();
        debug!("{workload} cache counters: {stats:?}");

        RunResult {
            workload,
            threads: self.config.threads,
            capacity: cache.capacity(),
            line_size: cache.config().line_size,
            placement: cache.placement(),
            counts,
            released: released.load(Ordering::Relaxed),
            clears,
            resident: cache.len(),
            cas_retries: stats.cas_retries,
            duration,
        }
    }
}

fn run_worker(
    cache: &LocklessCache,
    generator: PayloadGenerator,
    ops: usize,
    clear_every: Option<usize>,
) -> WorkerReport {
    let mut report = WorkerReport::default();
    for (i, payload) in generator.take(ops).enumerate() {
        match cache.put(payload) {
            PutOutcome::Found => report.counts.found += 1,
            PutOutcome::InsertedEmpty => report.counts.inserted_empty += 1,
            PutOutcome::InsertedEvicted(_) => report.counts.inserted_evicted += 1,
        }
        if let Some(every) = clear_every {
            if every > 0 && (i + 1) % every == 0 {
                cache.clear();
                report.clears += 1;
            }
        }
    }
    report
}
