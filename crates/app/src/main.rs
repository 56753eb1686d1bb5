//! `roadflow`: load a road network and a demand file, assign the demand and
//! run the flow model to completion, then print a JSON congestion report.
//!
//! Logs go to stderr so stdout carries only the report.

mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Assign O/D demand to a road network and simulate it with a link
/// transmission model.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "roadflow", version)]
pub struct Args {
    /// Overpass JSON response holding the road network.
    #[arg(long)]
    pub network: PathBuf,

    /// Demand file: `[{origin, destination, pathType, volume}]`.
    #[arg(long)]
    pub demand: PathBuf,

    /// Traffic parameters; missing fields keep their defaults.
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Paths enumerated per O/D pair, overriding the parameter file.
    #[arg(long)]
    pub k: Option<usize>,

    /// Give up after this many ticks.
    #[arg(long = "ticks", default_value_t = 10_000)]
    pub max_ticks: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run::run(&args) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("roadflow: {e}");
            ExitCode::FAILURE
        }
    }
}
