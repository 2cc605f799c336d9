//! Worker execution loop

use crate::error::{DispatchError, DispatchResult};
use crate::request::Query;
use crate::response::CompletionResult;
use crate::traits::Backend;

use super::stats::WorkerStats;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What happened to a single dequeued query
enum Step {
    /// Executed and reported
    Reported { success: bool },
    /// Abort was raised before the query finished or was reported
    Aborted,
    /// The dispatcher stopped listening for completions
    Disconnected,
}

/// Worker drains its own queue against the shared backend, one query at a time
///
/// Workers are tokio tasks spawned by the Dispatcher. Each owns the receiving
/// end of a bounded queue, so queries routed to it run strictly in enqueue
/// order.
///
/// Two shutdown paths exist:
/// - graceful: every sender of the queue is dropped; buffered queries are
///   still executed, then the worker exits.
/// - hard abort: the abort token is cancelled; the worker exits at the next
///   suspension point and may leave buffered queries unprocessed.
///
/// When both are observable at once the abort wins.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Backend (shared across workers via Arc)
    backend: Arc<dyn Backend>,

    /// This worker's input queue
    queue: mpsc::Receiver<Query>,

    /// Shared completion queue
    completions: mpsc::Sender<CompletionResult>,

    /// Run-wide abort signal
    abort: CancellationToken,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        backend: Arc<dyn Backend>,
        queue: mpsc::Receiver<Query>,
        completions: mpsc::Sender<CompletionResult>,
        abort: CancellationToken,
    ) -> Self {
        Self {
            id,
            backend,
            queue,
            completions,
            abort,
        }
    }

    /// Run the worker loop
    ///
    /// Returns the worker's stats once it exits through either shutdown path.
    /// Fails only if the completion queue closes while the worker still has
    /// results to report.
    pub async fn run(mut self) -> DispatchResult<WorkerStats> {
        let mut stats = WorkerStats::new(self.id);
        stats.start();

        tracing::debug!(worker_id = self.id, "Worker started");

        loop {
            let query = tokio::select! {
                biased;

                // Abort has priority over anything still buffered
                _ = self.abort.cancelled() => {
                    stats.aborted = true;
                    break;
                }

                next = self.queue.recv() => match next {
                    Some(query) => query,
                    // Closed and fully drained
                    None => break,
                },
            };

            match self.execute_one(query).await {
                Step::Reported { success } => stats.record(success),
                Step::Aborted => {
                    stats.aborted = true;
                    break;
                }
                Step::Disconnected => {
                    stats.stop();
                    tracing::warn!(
                        worker_id = self.id,
                        processed = stats.processed,
                        "Completion queue closed, worker stopping"
                    );
                    return Err(DispatchError::worker(self.id, "completion queue closed"));
                }
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            processed = stats.processed,
            errors = stats.errors,
            aborted = stats.aborted,
            buffered = self.queue.len(),
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Execute a single query and post its completion
    async fn execute_one(&self, query: Query) -> Step {
        // 1. Execute and measure
        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = self.abort.cancelled() => return Step::Aborted,
            outcome = self.backend.execute(&query) => outcome,
        };
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(()) => CompletionResult::success(self.id, elapsed),
            Err(e) => {
                tracing::warn!(
                    worker_id = self.id,
                    key = query.key(),
                    error = %e,
                    "Query failed"
                );
                CompletionResult::failure(self.id, elapsed, e)
            }
        };

        // 2. Report
        let success = result.is_success();

        tokio::select! {
            biased;
            _ = self.abort.cancelled() => Step::Aborted,
            sent = self.completions.send(result) => match sent {
                Ok(()) => Step::Reported { success },
                Err(_) => Step::Disconnected,
            },
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("buffered", &self.queue.len())
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}
