use cache_simulator::{models, runner, stats};
use clap::Parser;
use lockless_cache::Placement;
use log::{info, warn};
use std::path::PathBuf;

/// Lockless cache workload simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache capacity in slots (power of two)
    #[arg(short, long, default_value = "65536")]
    capacity: usize,

    /// Neighborhood line size in bytes (power of two, 4..=4096)
    #[arg(long, default_value = "64")]
    line_size: usize,

    /// Slot placement: aligned or interleaved
    #[arg(long, default_value = "aligned")]
    placement: String,

    /// Workloads to run (uniform, hotset, sequential)
    /// If not provided, all workloads will be run
    #[arg(short, long, value_name = "WORKLOADS", num_args = 1.., value_delimiter = ',')]
    workloads: Option<Vec<String>>,

    /// Number of worker threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Puts issued by each worker
    #[arg(long, default_value = "100000")]
    ops: usize,

    /// Payloads are drawn from 1..=KEY_SPACE
    #[arg(long, default_value = "262144")]
    key_space: u32,

    /// Size of the hot set for the hotset workload
    #[arg(long, default_value = "1024")]
    hot_set: u32,

    /// Percentage of hotset traffic aimed at the hot set
    #[arg(long, default_value = "80")]
    hot_percent: u8,

    /// Each worker clears the whole cache after this many of its own puts
    #[arg(long, value_name = "N")]
    clear_every: Option<usize>,

    /// Base random seed
    #[arg(long, default_value = "24301")]
    seed: u64,

    /// Export results to CSV file
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,

    /// Log cache construction and per-run counters
    #[arg(short, long)]
    verbose: bool,
}

/// Parse the placement string
fn parse_placement(name: &str) -> Placement {
    match name.to_lowercase().as_str() {
        "aligned" => Placement::Aligned,
        "interleaved" | "numa" => Placement::Interleaved,
        _ => {
            warn!("Unknown placement '{name}', using 'aligned'");
            Placement::Aligned
        }
    }
}

/// Resolve the requested workloads, defaulting to all of them
fn parse_workloads(names: Option<Vec<String>>) -> Vec<models::Workload> {
    let selected: Vec<models::Workload> = names
        .unwrap_or_default()
        .iter()
        .filter_map(|name| {
            let workload = models::Workload::parse(name);
            if workload.is_none() {
                warn!("Unknown workload '{name}', skipping");
            }
            workload
        })
        .collect();

    if selected.is_empty() {
        models::Workload::all()
    } else {
        selected
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = models::SimulationConfig {
        capacity: args.capacity,
        line_size: args.line_size,
        placement: parse_placement(&args.placement),
        workloads: parse_workloads(args.workloads),
        threads: args.threads,
        ops_per_thread: args.ops,
        key_space: args.key_space,
        hot_set: args.hot_set,
        hot_percent: args.hot_percent,
        clear_every: args.clear_every,
        seed: args.seed,
    };
    info!(
        "capacity {}, line {} bytes, {} placement, {} threads x {} puts, workloads {:?}",
        config.capacity,
        config.line_size,
        config.placement,
        config.threads,
        config.ops_per_thread,
        config
            .workloads
            .iter()
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
    );

    let results = runner::SimulationRunner::new(config).run()?;
    let stats = stats::SimulationStats::new(results);
    info!("{} workloads completed", stats.results().len());
    stats.print_summary();

    for result in stats.unbalanced() {
        warn!(
            "{} run does not balance: inserted payloads are not all accounted for",
            result.workload
        );
    }

    if let Some(csv_path) = args.output_csv {
        stats.export_csv(&csv_path)?;
        info!("Results exported to: {}", csv_path.display());
    }

    Ok(())
}
