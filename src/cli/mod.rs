//! CLI argument parsing and run handling

use crate::debug;
use anyhow::{bail, Context, Result};
use clap::Parser;
use dbperf_backends::{ConnectionConfig, PostgresBackend};
use dbperf_core::{DispatcherBuilder, QueryStats, DEFAULT_QUEUE_CAPACITY};
use dbperf_samplers::CpuUsageCsvSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// dbperf - replay a query workload against PostgreSQL and report latency
///
/// The input file may be given either as an argument or via -f.
#[derive(Parser, Debug)]
#[command(name = "dbperf")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "dbperf [OPTIONS] <FILENAME>")]
pub struct Cli {
    /// Number of concurrent workers
    #[arg(short = 'n', long = "workers", default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Path to input file containing queries to execute
    #[arg(short = 'f', long = "file", value_name = "PATH", conflicts_with = "filename")]
    pub file: Option<PathBuf>,

    /// Input file (alternative to -f)
    #[arg(value_name = "FILENAME", required_unless_present = "file")]
    pub filename: Option<PathBuf>,

    /// Capacity of each worker's queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the stats as JSON
    #[arg(long)]
    pub json: bool,

    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PW", default_value = "password", hide_env_values = true)]
    pub db_pw: String,

    /// Database name
    #[arg(long, env = "DB_NAME", default_value = "homework")]
    pub db_name: String,
}

impl Cli {
    /// Path of the query file, from -f or the positional argument
    pub fn input_path(&self) -> Result<PathBuf> {
        match (&self.file, &self.filename) {
            (Some(path), _) | (None, Some(path)) => Ok(path.clone()),
            (None, None) => bail!("no input file given"),
        }
    }

    /// Connection parameters
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_pw.clone(),
            dbname: self.db_name.clone(),
        }
    }

    /// Run the benchmark and print its stats
    pub async fn run(self) -> Result<()> {
        let path = self.input_path()?;

        let mut dispatcher = DispatcherBuilder::new()
            .pool_size(self.workers)
            .queue_capacity(self.queue_capacity)
            .debug(debug::from_env())
            .build()
            .context("Invalid worker pool configuration")?;

        let mut source = CpuUsageCsvSource::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let connection = self.connection();
        tracing::debug!(?connection, "Connecting");
        let backend = PostgresBackend::connect(&connection)
            .await
            .context("Failed to connect to database")?;

        let stats = dispatcher
            .run_with_signal_handling(
                self.timeout.map(Duration::from_secs),
                Arc::new(backend),
                &mut source,
            )
            .await
            .with_context(|| format!("Run over {} failed", path.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print!("{}", render_summary(&stats));
        }

        Ok(())
    }
}

/// Text summary printed after a successful run
pub fn render_summary(stats: &QueryStats) -> String {
    format!(
        "{} queries processed after {:?}\nmin: {:?}; max: {:?}; avg: {:?}; median: {:?}\n",
        stats.processed, stats.total_elapsed, stats.min, stats.max, stats.avg, stats.median
    )
}
