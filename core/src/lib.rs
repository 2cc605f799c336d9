//! dbperf-core: Keyed worker-pool dispatcher for query latency runs
//!
//! This crate provides the core used by every dbperf component, including:
//!
//! - Work item types (queries, completion results)
//! - Collaborator traits (Backend, QuerySource)
//! - The worker execution loop and the dispatcher that owns the pool
//! - Latency statistics
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod request;
pub mod response;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use channel::{ChannelConfig, DEFAULT_QUEUE_CAPACITY};
pub use config::{ConfigError, DebugConfig, DispatcherConfig};
pub use dispatcher::{aggregate_worker_stats, Dispatcher, DispatcherBuilder, PoolSummary, RoutingTable};
pub use error::*;
pub use metrics::*;
pub use request::*;
pub use response::*;
pub use traits::*;
pub use worker::{Worker, WorkerBuilder, WorkerStats};
