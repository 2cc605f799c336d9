//! Builder pattern for Worker construction

use crate::error::{DispatchError, DispatchResult};
use crate::request::Query;
use crate::response::CompletionResult;
use crate::traits::Backend;

use super::executor::Worker;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let (queue_tx, queue_rx) = mpsc::channel(20);
/// let worker = WorkerBuilder::new(0)
///     .backend(backend)
///     .queue(queue_rx)
///     .completions(completion_tx)
///     .abort(abort.clone())
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    backend: Option<Arc<dyn Backend>>,
    queue: Option<mpsc::Receiver<Query>>,
    completions: Option<mpsc::Sender<CompletionResult>>,
    abort: Option<CancellationToken>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            backend: None,
            queue: None,
            completions: None,
            abort: None,
        }
    }

    /// Set the backend
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the worker's input queue
    pub fn queue(mut self, queue: mpsc::Receiver<Query>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the shared completion queue sender
    pub fn completions(mut self, tx: mpsc::Sender<CompletionResult>) -> Self {
        self.completions = Some(tx);
        self
    }

    /// Set the abort token
    pub fn abort(mut self, token: CancellationToken) -> Self {
        self.abort = Some(token);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> DispatchResult<Worker> {
        let backend = self
            .backend
            .ok_or_else(|| DispatchError::missing_config("backend"))?;
        let queue = self
            .queue
            .ok_or_else(|| DispatchError::missing_config("queue"))?;
        let completions = self
            .completions
            .ok_or_else(|| DispatchError::missing_config("completions"))?;
        let abort = self
            .abort
            .ok_or_else(|| DispatchError::missing_config("abort"))?;

        Ok(Worker::new(self.id, backend, queue, completions, abort))
    }
}
