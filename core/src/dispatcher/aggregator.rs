//! Per-worker stats aggregation

use std::time::Duration;

use crate::worker::WorkerStats;

/// Pool-level view of a finished run, built from every worker's stats
///
/// Mostly useful to see how evenly the routing keys spread the load: with
/// sticky routing a dominant key leaves the other workers idle.
#[derive(Debug, Clone, Default)]
pub struct PoolSummary {
    /// Number of workers that reported
    pub total_workers: usize,

    /// Queries processed across the pool
    pub total_processed: usize,

    /// Failed queries across the pool
    pub total_errors: usize,

    /// Highest per-worker processed count
    pub max_processed: usize,

    /// Lowest per-worker processed count
    pub min_processed: usize,

    /// Workers that processed nothing
    pub idle_workers: usize,

    /// Workers that exited through the abort path
    pub aborted_workers: usize,

    /// Longest worker lifetime
    pub total_duration: Duration,

    /// Overall throughput
    pub queries_per_second: f64,
}

impl PoolSummary {
    /// Busiest worker's load relative to the mean (1.0 is perfectly even)
    pub fn skew(&self) -> f64 {
        if self.total_processed == 0 || self.total_workers == 0 {
            return 1.0;
        }
        let mean = self.total_processed as f64 / self.total_workers as f64;
        self.max_processed as f64 / mean
    }
}

/// Aggregate statistics from every worker in the pool
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> PoolSummary {
    if stats.is_empty() {
        return PoolSummary::default();
    }

    let total_processed: usize = stats.iter().map(|s| s.processed).sum();
    let total_errors: usize = stats.iter().map(|s| s.errors).sum();
    let max_processed = stats.iter().map(|s| s.processed).max().unwrap_or(0);
    let min_processed = stats.iter().map(|s| s.processed).min().unwrap_or(0);
    let idle_workers = stats.iter().filter(|s| s.processed == 0).count();
    let aborted_workers = stats.iter().filter(|s| s.aborted).count();

    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let queries_per_second = if secs > 0.0 {
        total_processed as f64 / secs
    } else {
        0.0
    };

    PoolSummary {
        total_workers: stats.len(),
        total_processed,
        total_errors,
        max_processed,
        min_processed,
        idle_workers,
        aborted_workers,
        total_duration,
        queries_per_second,
    }
}
