//! Worker statistics tracking

use std::time::{Duration, Instant};

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Worker identifier
    pub worker_id: usize,

    /// Number of queries executed and reported (success or failure)
    pub processed: usize,

    /// Number of those queries the backend failed
    pub errors: usize,

    /// Whether the worker exited through the abort path
    pub aborted: bool,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats for a worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record a reported query
    pub fn record(&mut self, success: bool) {
        self.processed += 1;
        if !success {
            self.errors += 1;
        }
    }

    /// Time between start and stop, or until now while still running
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(Instant::now);
        Some(end.saturating_duration_since(start))
    }
}
