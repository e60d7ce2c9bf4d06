//! memodemo - replays memoization scenarios against memocache

mod scenarios;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use memocache::{CacheConfig, DEFAULT_CAPACITY};
use tracing::info;

use crate::scenarios::{Report, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Cache capacity (number of results)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// square(x) = x * x
    Square,
    /// add(a, b=10) called with mixed argument syntax
    Add,
    /// Recursive fibonacci through the cache
    Fibonacci,
    /// expensive_computation(x, y, operation="add")
    Expensive,
    /// Everything above
    All,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting memodemo v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {}", args.capacity);

    let runner = ScenarioRunner::new(CacheConfig::default().with_capacity(args.capacity));
    let reports = runner.run(args.scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(())
}

fn print_report(report: &Report) {
    println!("\n=== {} ===", report.scenario);
    for line in &report.calls {
        println!("  {}", line);
    }
    println!("  stats: {}", report.stats);
}
