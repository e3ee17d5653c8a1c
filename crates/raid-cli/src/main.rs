mod cli;
mod commands;
mod disks;
mod metrics_runtime;

#[cfg(test)]
mod commands_tests;

use clap::Parser;
use raid_rs::config::DEFAULT_BLOCK_SIZE;
use raid_rs::metrics::install_metrics_sink;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::metrics_runtime::CountingSink;

/// BLOCK_SIZE is the virtual and physical block size used by the CLI.
pub const BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let sink = CountingSink::new();
    if !install_metrics_sink(sink.clone()) {
        warn!("metrics sink already installed");
    }

    let engine = disks::open_engine(&cli.array)?;
    let res = commands::run(&engine, &cli.command, &mut std::io::stdout().lock());
    drop(engine);

    info!(disk = %sink.disk_totals(), raid = %sink.raid_totals(), "io summary");
    res
}
