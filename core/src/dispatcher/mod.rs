//! Dispatcher for keyed worker-pool runs
//!
//! The Dispatcher coordinates a complete run:
//! - Spawning one worker task per pool slot, each with its own bounded queue
//! - Routing queries to workers by key (sticky, first assignment round robin)
//! - Admitting one new query per completion, with backpressure from full queues
//! - Ending the run by graceful drain on exhaustion, or hard abort on failure
//! - Reducing completion latencies to `QueryStats`
//!
//! # Example
//!
//! ```ignore
//! use dbperf_core::{Dispatcher, DispatcherBuilder};
//!
//! let mut dispatcher = DispatcherBuilder::new().pool_size(4).build()?;
//! let stats = dispatcher
//!     .run(CancellationToken::new(), backend, &mut source)
//!     .await?;
//! println!("{} queries processed after {:?}", stats.processed, stats.total_elapsed);
//! ```

mod aggregator;
mod builder;
mod executor;
mod routing;

pub use aggregator::{aggregate_worker_stats, PoolSummary};
pub use builder::DispatcherBuilder;
pub use executor::Dispatcher;
pub use routing::RoutingTable;
