//! pftree: walk a directory tree and run stages over every directory.
//!
//! Thin binary entry point. All logic lives in the `pftree-core` crate.

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use pftree_core::stages::ListingStages;
use pftree_core::PfTree;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    debug!("Arguments: {cli:?}");
    let config = cli.to_config()?;
    let listing = cli
        .test
        .map(|spec| ListingStages::new(spec, config.overwrite));

    let mut tree = PfTree::new(config)?;
    if let Some(stages) = &listing {
        tree = tree.with_read(stages).with_analyze(stages).with_write(stages);
    }

    let report = tree.run()?;
    output::print_report(cli, &report)
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "pftree=info,pftree_core=info,warn",
        1 => "pftree=debug,pftree_core=debug,warn",
        _ => "pftree=trace,pftree_core=trace,warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
