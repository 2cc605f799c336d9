//! Completion records posted by workers

use crate::traits::BackendError;
use std::time::Duration;

/// Outcome of one executed query
///
/// Produced exactly once per query a worker executes and consumed by the
/// dispatcher's aggregation loop.
#[derive(Debug)]
pub struct CompletionResult {
    /// Worker that executed the query
    pub worker_id: usize,

    /// Wall-clock time spent in the backend
    pub elapsed: Duration,

    /// Backend outcome
    pub outcome: Result<(), BackendError>,
}

impl CompletionResult {
    /// Create a successful completion
    pub fn success(worker_id: usize, elapsed: Duration) -> Self {
        Self {
            worker_id,
            elapsed,
            outcome: Ok(()),
        }
    }

    /// Create a failed completion
    pub fn failure(worker_id: usize, elapsed: Duration, error: BackendError) -> Self {
        Self {
            worker_id,
            elapsed,
            outcome: Err(error),
        }
    }

    /// Check if the query succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
