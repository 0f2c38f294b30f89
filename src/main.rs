//! CLI entry point. The only piece of this crate allowed to touch the
//! filesystem or `std::env::args` — everything else lives in the library
//! and is driven purely through [`repcrec::Driver::run_trace`].

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use repcrec::{Driver, SimConfig};

/// Runs a replicated concurrency-control trace and prints the resulting
/// commit/abort/read/dump events, one per line.
#[derive(Debug, Parser)]
#[command(name = "repcrec", about = "Replicated concurrency-control simulator")]
struct Cli {
    /// Path to the trace file.
    trace: String,

    /// Number of sites in the topology.
    #[arg(long, default_value_t = SimConfig::default().num_sites)]
    sites: u32,

    /// Number of variables in the topology.
    #[arg(long, default_value_t = SimConfig::default().num_variables)]
    variables: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let contents = match fs::read_to_string(&cli.trace) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("repcrec: could not read {}: {e}", cli.trace);
            return ExitCode::FAILURE;
        }
    };

    let (ops, errors) = repcrec::core::trace::parse_trace(&contents);
    for e in &errors {
        eprintln!("repcrec: {e}");
    }

    let config = SimConfig { num_sites: cli.sites, num_variables: cli.variables };
    let mut driver = Driver::new(config);
    for line in driver.run_trace(&ops) {
        println!("{line}");
    }

    ExitCode::SUCCESS
}
