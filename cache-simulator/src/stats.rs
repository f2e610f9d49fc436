// Statistics reporting for cache simulation

use crate::models::{CsvResultRow, RunResult};
use std::path::Path;

/// Collects and reports results from simulation runs
pub struct SimulationStats {
    results: Vec<RunResult>,
}

impl SimulationStats {
    pub fn new(results: Vec<RunResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Runs whose outcome accounting does not balance
    pub fn unbalanced(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|result| !result.is_balanced())
    }

    /// Print a summary report of the simulation results
    pub fn print_summary(&self) {
        println!("\nLockless Cache Simulation Summary");
        println!("=================================");
        println!(
            "{:<11} {:>7} {:>10} {:>10} {:>10} {:>10} {:>8} {:>10} {:>9} {:>12}",
            "Workload",
            "Threads",
            "Ops",
            "HitRate",
            "EvictRate",
            "Released",
            "Clears",
            "Resident",
            "CasRetry",
            "Ops/sec"
        );
        println!("{}", "-".repeat(108));

        for result in &self.results {
            println!(
                "{:<11} {:>7} {:>10} {:>9.2}% {:>9.2}% {:>10} {:>8} {:>10} {:>9} {:>12.0}",
                result.workload.as_str(),
                result.threads,
                result.counts.total(),
                result.counts.hit_rate() * 100.0,
                result.counts.eviction_rate() * 100.0,
                result.released,
                result.clears,
                result.resident,
                result.cas_retries,
                result.ops_per_sec()
            );
        }
    }

    /// Export results to CSV, one row per workload
    pub fn export_csv(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for result in &self.results {
            writer.serialize(CsvResultRow::from(result))?;
        }
        writer.flush()?;
        Ok(())
    }
}
