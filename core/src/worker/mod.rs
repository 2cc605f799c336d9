//! Worker module for executing routed queries
//!
//! The Worker is the execution unit of a run, responsible for the simple loop:
//! **dequeue -> execute -> report -> repeat**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Waits for the next query on its own bounded queue (or the abort signal)
//! 2. Executes the query via the shared Backend and times it
//! 3. Posts a CompletionResult to the shared completion queue
//! 4. Counts the query as processed
//!
//! # Example
//!
//! ```ignore
//! use dbperf_core::worker::WorkerBuilder;
//!
//! let worker = WorkerBuilder::new(0)
//!     .backend(backend)
//!     .queue(queue_rx)
//!     .completions(completion_tx)
//!     .abort(abort)
//!     .build()?;
//!
//! let stats = tokio::spawn(worker.run()).await??;
//! println!("Processed: {}", stats.processed);
//! ```

mod builder;
mod executor;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use stats::WorkerStats;
