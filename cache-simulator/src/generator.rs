//! Payload generation for simulated workloads
//!
//! Every worker owns one [`PayloadGenerator`], seeded from the run's base seed
//! and the worker index, so a run is reproducible for a fixed thread count.

use crate::models::Workload;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces the non-zero payload stream for one worker
pub struct PayloadGenerator {
    workload: Workload,
    key_space: u32,
    hot_set: u32,
    hot_percent: u8,
    rng: StdRng,
    /// Position of the sequential walk
    cursor: u32,
}

impl PayloadGenerator {
    /// Create a generator for `worker` of a run seeded with `seed`
    ///
    /// `key_space` must be non-zero; `hot_set` is clamped to `key_space`.
    pub fn new(
        workload: Workload,
        key_space: u32,
        hot_set: u32,
        hot_percent: u8,
        seed: u64,
        worker: usize,
    ) -> Self {
        assert!(key_space > 0, "key space must not be empty");
        let rng = StdRng::seed_from_u64(seed ^ (worker as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        // Sequential walkers start spread out so they only overlap after wrapping.
        let stride = (key_space / 64).max(1);
        let cursor = (worker as u32).wrapping_mul(stride) % key_space;
        Self {
            workload,
            key_space,
            hot_set: hot_set.clamp(1, key_space),
            hot_percent: hot_percent.min(100),
            rng,
            cursor,
        }
    }

    /// Next payload, always in `1..=key_space`
    pub fn next_payload(&mut self) -> u32 {
        match self.workload {
            Workload::Uniform => self.rng.gen_range(1..=self.key_space),
            Workload::Hotset => {
                if self.rng.gen_range(0..100u8) < self.hot_percent {
                    self.rng.gen_range(1..=self.hot_set)
                } else {
                    self.rng.gen_range(1..=self.key_space)
                }
            }
            Workload::Sequential => {
                let payload = self.cursor + 1;
                self.cursor = (self.cursor + 1) % self.key_space;
                payload
            }
        }
    }
}

impl Iterator for PayloadGenerator {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_payload())
    }
}
