//! dbperf - query latency benchmark for PostgreSQL / TimescaleDB
//!
//! Replays a CSV of queries through a keyed worker pool and prints latency
//! statistics.
//!
//! # Environment Variables
//!
//! - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PW`, `DB_NAME`: connection settings
//!   (defaults: localhost, 5432, postgres, password, homework)
//! - `DBPERFDEBUG`: debug knobs, see `debug`
//! - `RUST_LOG`: log filter (default: info)

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod debug;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Run the benchmark
    cli.run().await?;

    Ok(())
}
