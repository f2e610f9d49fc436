// Data models for cache simulation

use lockless_cache::Placement;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Synthetic payload streams the simulator can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Workload {
    /// Payloads drawn uniformly from the whole key space
    Uniform,
    /// Most payloads drawn from a small hot set, the rest uniformly
    Hotset,
    /// Each thread walks the key space in order from its own offset
    Sequential,
}

impl Workload {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workload::Uniform => "uniform",
            Workload::Hotset => "hotset",
            Workload::Sequential => "sequential",
        }
    }

    /// Get all available workloads
    pub fn all() -> Vec<Workload> {
        vec![Workload::Uniform, Workload::Hotset, Workload::Sequential]
    }

    pub fn parse(name: &str) -> Option<Workload> {
        match name.to_lowercase().as_str() {
            "uniform" | "random" => Some(Workload::Uniform),
            "hotset" | "hot" => Some(Workload::Hotset),
            "sequential" | "seq" => Some(Workload::Sequential),
            _ => None,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of slots in the cache
    pub capacity: usize,
    /// Neighborhood line size in bytes
    pub line_size: usize,
    /// Placement of the slot array
    pub placement: Placement,
    /// Workloads to run, one cache per workload
    pub workloads: Vec<Workload>,
    /// Number of worker threads
    pub threads: usize,
    /// Puts issued by each worker
    pub ops_per_thread: usize,
    /// Distinct payloads are drawn from `1..=key_space`
    pub key_space: u32,
    /// Size of the hot set for the hotset workload
    pub hot_set: u32,
    /// Percentage of hotset traffic aimed at the hot set
    pub hot_percent: u8,
    /// Each worker clears the whole cache after this many of its own puts
    pub clear_every: Option<usize>,
    /// Base seed; each worker derives its own stream from it
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 16,
            line_size: 64,
            placement: Placement::Aligned,
            workloads: Workload::all(),
            threads: 4,
            ops_per_thread: 100_000,
            key_space: 1 << 18,
            hot_set: 1 << 10,
            hot_percent: 80,
            clear_every: None,
            seed: 0x5eed,
        }
    }
}

/// Outcome counts from one or more workers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub found: u64,
    pub inserted_empty: u64,
    pub inserted_evicted: u64,
}

impl OutcomeCounts {
    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.found += other.found;
        self.inserted_empty += other.inserted_empty;
        self.inserted_evicted += other.inserted_evicted;
    }

    pub fn total(&self) -> u64 {
        self.found + self.inserted_empty + self.inserted_evicted
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.found as f64 / total as f64
        }
    }

    pub fn eviction_rate(&self) -> f64 {
        let inserted = self.inserted_empty + self.inserted_evicted;
        if inserted == 0 {
            0.0
        } else {
            self.inserted_evicted as f64 / inserted as f64
        }
    }
}

/// Result of running one workload
#[derive(Debug, Clone)]
pub struct RunResult {
    pub workload: Workload,
    pub threads: usize,
    pub capacity: usize,
    pub line_size: usize,
    pub placement: Placement,
    pub counts: OutcomeCounts,
    /// Payloads handed to the release callback by clears
    pub released: u64,
    /// Number of full clears performed
    pub clears: u64,
    /// Occupied slots when the run finished
    pub resident: usize,
    /// Lost compare-and-swap attempts reported by the cache
    pub cas_retries: u64,
    pub duration: Duration,
}

impl RunResult {
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.counts.total() as f64 / secs
        } else {
            0.0
        }
    }

    /// Every inserted payload is either still resident, was evicted back to a
    /// worker, or was released by a clear.
    pub fn is_balanced(&self) -> bool {
        let inserted = self.counts.inserted_empty + self.counts.inserted_evicted;
        inserted == self.counts.inserted_evicted + self.released + self.resident as u64
    }
}

/// CSV output row
#[derive(Debug, Serialize)]
pub struct CsvResultRow {
    pub workload: String,
    pub threads: usize,
    pub capacity: usize,
    pub line_size: usize,
    pub placement: String,
    pub ops: u64,
    pub found: u64,
    pub inserted_empty: u64,
    pub inserted_evicted: u64,
    pub released: u64,
    pub clears: u64,
    pub resident: usize,
    pub cas_retries: u64,
    pub hit_rate: f64,
    pub eviction_rate: f64,
    pub duration_ms: u128,
    pub ops_per_sec: f64,
}

impl From<&RunResult> for CsvResultRow {
    fn from(result: &RunResult) -> Self {
        Self {
            workload: result.workload.as_str().to_string(),
            threads: result.threads,
            capacity: result.capacity,
            line_size: result.line_size,
            placement: result.placement.as_str().to_string(),
            ops: result.counts.total(),
            found: result.counts.found,
            inserted_empty: result.counts.inserted_empty,
            inserted_evicted: result.counts.inserted_evicted,
            released: result.released,
            clears: result.clears,
            resident: result.resident,
            cas_retries: result.cas_retries,
            hit_rate: result.counts.hit_rate(),
            eviction_rate: result.counts.eviction_rate(),
            duration_ms: result.duration.as_millis(),
            ops_per_sec: result.ops_per_sec(),
        }
    }
}
