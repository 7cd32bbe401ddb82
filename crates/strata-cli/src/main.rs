//! Thin client over `strata_core::Engine`. Per-command business logic
//! (cataloging, per-format listing, conversion) stays out of this binary;
//! each subcommand only wires `clap` arguments to the engine's exposed
//! operations and prints what comes back.

mod cli;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    cli.command.run()
}
