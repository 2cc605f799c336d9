//! Dispatcher execution logic

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::metrics::QueryStats;
use crate::request::Query;
use crate::response::CompletionResult;
use crate::traits::{Backend, QuerySource};
use crate::worker::{WorkerBuilder, WorkerStats};

use super::aggregator::{aggregate_worker_stats, PoolSummary};
use super::routing::RoutingTable;

/// Worker id paired with how its task ended
type WorkerExit = (usize, DispatchResult<WorkerStats>);

/// Channels and tasks of one run
struct Pool {
    /// Input queue sender per worker, indexed by worker id
    queues: Vec<mpsc::Sender<Query>>,

    /// Shared completion queue (workers -> dispatcher)
    completions: mpsc::Receiver<CompletionResult>,

    /// Running worker tasks
    workers: JoinSet<WorkerExit>,

    /// Run-wide hard abort signal, child of the caller's token
    abort: CancellationToken,
}

/// What woke the admission loop
enum Event {
    Completed(CompletionResult),
    Cancelled,
    WorkerExited(Result<WorkerExit, JoinError>),
    CompletionsClosed,
}

/// Where seeding stopped
struct Seeded {
    dispatched: usize,
    exhausted: bool,
}

/// Dispatcher owns the worker pool and the routing table for one run
///
/// Queries pulled from the source are routed by key: a key keeps the worker
/// it was first assigned (round robin), so queries sharing a key execute in
/// source order. After seeding, exactly one new query is admitted per
/// completion. A dominant key can therefore fill its worker's queue while
/// other workers sit idle; the pool summary logged at the end of each run
/// shows that skew.
pub struct Dispatcher {
    /// Pool configuration
    pub(crate) config: DispatcherConfig,

    /// Sticky key -> worker assignments
    routing: RoutingTable,

    /// Stats of every worker joined so far, sorted by worker id at run end
    worker_stats: Vec<WorkerStats>,

    /// Queries handed to worker queues
    dispatched: usize,

    /// A dispatcher runs once
    started: bool,
}

impl Dispatcher {
    /// Create a dispatcher with `pool_size` workers
    ///
    /// A pool size of zero is raised to one. Use `DispatcherBuilder` to
    /// reject invalid configuration instead.
    pub fn new(pool_size: usize) -> Self {
        Self::with_config(DispatcherConfig::new(pool_size.max(1)))
    }

    /// Create a dispatcher from an already validated configuration
    pub(crate) fn with_config(config: DispatcherConfig) -> Self {
        Self {
            routing: RoutingTable::new(config.pool_size),
            config,
            worker_stats: Vec::new(),
            dispatched: 0,
            started: false,
        }
    }

    /// Get the dispatcher configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Number of workers in the pool
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Key assignments made so far
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Per-worker stats of the last run, ordered by worker id
    pub fn worker_stats(&self) -> &[WorkerStats] {
        &self.worker_stats
    }

    /// Pool-level summary of the last run
    pub fn summary(&self) -> PoolSummary {
        aggregate_worker_stats(&self.worker_stats)
    }

    /// Run every query from `source` through the pool
    ///
    /// Returns latency stats only if the source was exhausted cleanly and
    /// every dispatched query completed without error. Any execution failure,
    /// source failure or cancellation of `cancel` aborts all workers and is
    /// returned instead. Worker tasks are joined on every path.
    pub async fn run(
        &mut self,
        cancel: CancellationToken,
        backend: Arc<dyn Backend>,
        source: &mut dyn QuerySource,
    ) -> DispatchResult<QueryStats> {
        if self.started {
            return Err(DispatchError::config(
                "dispatcher has already run; create a new one for each run",
            ));
        }
        self.started = true;

        let start = Instant::now();
        tracing::info!(
            pool_size = self.config.pool_size,
            queue_capacity = self.config.channel.queue_capacity,
            backend = backend.name(),
            source = source.name(),
            "Starting run"
        );

        let mut pool = self.spawn_workers(&cancel, backend)?;

        let result = match self.admit(&cancel, &mut pool, source).await {
            Ok(elapsed) => self.finish(pool, elapsed).await,
            Err(e) => {
                self.abort(pool, &e).await;
                Err(e)
            }
        };

        let summary = self.summary();
        match &result {
            Ok(stats) => tracing::info!(
                elapsed_secs = start.elapsed().as_secs_f64(),
                processed = stats.processed,
                workers = summary.total_workers,
                idle_workers = summary.idle_workers,
                skew = summary.skew(),
                qps = summary.queries_per_second,
                "Run completed"
            ),
            Err(e) => tracing::error!(
                error = %e,
                dispatched = self.dispatched,
                processed = summary.total_processed,
                aborted_workers = summary.aborted_workers,
                "Run failed"
            ),
        }

        result
    }

    /// Run with a deadline
    ///
    /// Aborts the run once `timeout` elapses and reports `TimedOut`.
    pub async fn run_with_timeout(
        &mut self,
        cancel: CancellationToken,
        timeout: Duration,
        backend: Arc<dyn Backend>,
        source: &mut dyn QuerySource,
    ) -> DispatchResult<QueryStats> {
        let deadline = cancel.child_token();
        let timed_out = Arc::new(AtomicBool::new(false));

        // Spawn timeout task
        let timeout_handle = tokio::spawn({
            let deadline = deadline.clone();
            let timed_out = Arc::clone(&timed_out);
            async move {
                tokio::time::sleep(timeout).await;
                tracing::info!(?timeout, "Timeout reached, aborting run...");
                timed_out.store(true, Ordering::SeqCst);
                deadline.cancel();
            }
        });

        let result = self.run(deadline, backend, source).await;

        // Abort timeout task if still running
        timeout_handle.abort();

        match result {
            Err(DispatchError::Cancelled) if timed_out.load(Ordering::SeqCst) => {
                Err(DispatchError::TimedOut(timeout))
            }
            other => other,
        }
    }

    /// Run with Ctrl+C handling and an optional deadline
    ///
    /// Ctrl+C aborts the run and reports `Cancelled`.
    pub async fn run_with_signal_handling(
        &mut self,
        timeout: Option<Duration>,
        backend: Arc<dyn Backend>,
        source: &mut dyn QuerySource,
    ) -> DispatchResult<QueryStats> {
        let cancel = CancellationToken::new();

        // Spawn signal handler task
        let signal_handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Received Ctrl+C, cancelling run...");
                        cancel.cancel();
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                    }
                }
            }
        });

        let result = match timeout {
            Some(timeout) => self.run_with_timeout(cancel, timeout, backend, source).await,
            None => self.run(cancel, backend, source).await,
        };

        // Abort signal handler if still running
        signal_handle.abort();

        result
    }

    /// Create every worker queue and start every worker task
    fn spawn_workers(
        &self,
        cancel: &CancellationToken,
        backend: Arc<dyn Backend>,
    ) -> DispatchResult<Pool> {
        let pool_size = self.config.pool_size;
        let channel = self.config.channel;
        let abort = cancel.child_token();

        let (completion_tx, completions) = mpsc::channel(channel.completion_capacity(pool_size));
        let mut queues = Vec::with_capacity(pool_size);
        let mut workers = JoinSet::new();

        for worker_id in 0..pool_size {
            let (queue_tx, queue_rx) = mpsc::channel(channel.queue_capacity);
            let worker = WorkerBuilder::new(worker_id)
                .backend(Arc::clone(&backend))
                .queue(queue_rx)
                .completions(completion_tx.clone())
                .abort(abort.clone())
                .build()?;

            queues.push(queue_tx);
            workers.spawn(async move {
                let exit = AssertUnwindSafe(worker.run())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(DispatchError::worker(worker_id, "worker panicked")));
                (worker_id, exit)
            });
        }

        Ok(Pool {
            queues,
            completions,
            workers,
            abort,
        })
    }

    /// Seed the pool, then admit one query per completion until exhaustion
    ///
    /// Returns the elapsed time of every completion observed so far.
    async fn admit(
        &mut self,
        cancel: &CancellationToken,
        pool: &mut Pool,
        source: &mut dyn QuerySource,
    ) -> DispatchResult<Vec<Duration>> {
        let seeded = self.seed(cancel, pool, source).await?;
        tracing::debug!(
            dispatched = seeded.dispatched,
            exhausted = seeded.exhausted,
            "Seeding finished"
        );

        let mut elapsed = Vec::with_capacity(self.config.channel.max_in_flight(pool.queues.len()));
        if seeded.exhausted {
            return Ok(elapsed);
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                Some(joined) = pool.workers.join_next() => Event::WorkerExited(joined),
                next = pool.completions.recv() => match next {
                    Some(result) => Event::Completed(result),
                    None => Event::CompletionsClosed,
                },
            };

            let result = match event {
                Event::Completed(result) => result,
                Event::Cancelled => return Err(DispatchError::Cancelled),
                Event::WorkerExited(joined) => return Err(self.early_exit(joined)),
                Event::CompletionsClosed => {
                    let joined = pool.workers.join_next().await;
                    return Err(match joined {
                        Some(joined) => self.early_exit(joined),
                        None => DispatchError::config("worker pool is empty"),
                    });
                }
            };

            if let Err(source) = result.outcome {
                return Err(DispatchError::Execution {
                    worker_id: result.worker_id,
                    source,
                });
            }
            elapsed.push(result.elapsed);
            self.report_progress(elapsed.len());

            match source.next_query() {
                Ok(query) => {
                    self.dispatch(cancel, pool, query).await?;
                }
                Err(e) if e.is_exhausted() => return Ok(elapsed),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Route queries until every worker has one, the source runs dry, or the
    /// in-flight bound is reached
    async fn seed(
        &mut self,
        cancel: &CancellationToken,
        pool: &Pool,
        source: &mut dyn QuerySource,
    ) -> DispatchResult<Seeded> {
        let pool_size = pool.queues.len();
        let limit = self.config.channel.max_in_flight(pool_size);
        let mut seeded = vec![false; pool_size];
        let mut covered = 0;
        let mut dispatched = 0;

        while covered < pool_size && dispatched < limit {
            let query = match source.next_query() {
                Ok(query) => query,
                Err(e) if e.is_exhausted() => {
                    return Ok(Seeded {
                        dispatched,
                        exhausted: true,
                    })
                }
                Err(e) => return Err(e.into()),
            };

            let worker_id = self.dispatch(cancel, pool, query).await?;
            dispatched += 1;
            if !std::mem::replace(&mut seeded[worker_id], true) {
                covered += 1;
            }
        }

        Ok(Seeded {
            dispatched,
            exhausted: false,
        })
    }

    /// Route a query and enqueue it, waiting while the worker's queue is full
    async fn dispatch(
        &mut self,
        cancel: &CancellationToken,
        pool: &Pool,
        query: Query,
    ) -> DispatchResult<usize> {
        let worker_id = self.routing.route(query.key());
        if self.config.debug.log_routing {
            tracing::debug!(key = query.key(), worker_id, "Routed query");
        }

        let queue = &pool.queues[worker_id];
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            sent = queue.send(query) => {
                sent.map_err(|_| DispatchError::worker(worker_id, "input queue closed"))?;
                self.dispatched += 1;
                Ok(worker_id)
            }
        }
    }

    /// Graceful path: close queues, join workers, drain completions
    async fn finish(&mut self, pool: Pool, mut elapsed: Vec<Duration>) -> DispatchResult<QueryStats> {
        let Pool {
            queues,
            mut completions,
            workers,
            abort: _,
        } = pool;

        // Workers execute whatever is still buffered, then exit
        drop(queues);
        self.join_workers(workers).await?;

        // Only an external cancellation can abort a worker at this point
        if self.worker_stats.iter().any(|s| s.aborted) {
            return Err(DispatchError::Cancelled);
        }

        completions.close();
        while let Some(result) = completions.recv().await {
            if let Err(source) = result.outcome {
                return Err(DispatchError::Execution {
                    worker_id: result.worker_id,
                    source,
                });
            }
            elapsed.push(result.elapsed);
        }

        if elapsed.len() != self.dispatched {
            return Err(DispatchError::config(format!(
                "{} queries dispatched but {} completed",
                self.dispatched,
                elapsed.len()
            )));
        }

        Ok(QueryStats::from_durations(&mut elapsed))
    }

    /// Hard abort path: raise the abort signal and join every worker
    async fn abort(&mut self, pool: Pool, reason: &DispatchError) {
        tracing::warn!(error = %reason, "Aborting run");

        let Pool {
            queues,
            completions,
            workers,
            abort,
        } = pool;

        abort.cancel();
        drop(queues);

        if let Err(e) = self.join_workers(workers).await {
            tracing::debug!(error = %e, "Worker error while aborting");
        }
        drop(completions);
    }

    /// Wait for every remaining worker, keeping the first failure
    async fn join_workers(&mut self, mut workers: JoinSet<WorkerExit>) -> DispatchResult<()> {
        let mut first_error = None;

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((worker_id, Ok(stats))) => {
                    tracing::debug!(
                        worker_id,
                        processed = stats.processed,
                        aborted = stats.aborted,
                        "Worker joined"
                    );
                    self.worker_stats.push(stats);
                }
                Ok((worker_id, Err(e))) => {
                    tracing::error!(worker_id, error = %e, "Worker returned error");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Worker task failed");
                    first_error.get_or_insert(e.into());
                }
            }
        }

        self.worker_stats.sort_by_key(|s| s.worker_id);
        first_error.map_or(Ok(()), Err)
    }

    /// Turn a worker that exited during admission into the run's error
    fn early_exit(&mut self, joined: Result<WorkerExit, JoinError>) -> DispatchError {
        match joined {
            Ok((worker_id, Ok(stats))) => {
                self.worker_stats.push(stats);
                DispatchError::worker(worker_id, "exited before the run finished")
            }
            Ok((_, Err(e))) => e,
            Err(e) => e.into(),
        }
    }

    fn report_progress(&self, completed: usize) {
        let every = self.config.debug.progress_every;
        if every > 0 && completed as u64 % every == 0 {
            tracing::info!(completed, dispatched = self.dispatched, "Progress");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("routed_keys", &self.routing.len())
            .field("started", &self.started)
            .finish()
    }
}
