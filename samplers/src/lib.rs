//! Query sources for dbperf
//!
//! This crate provides implementations of the `QuerySource` trait for:
//!
//! - CPU usage range queries read from a CSV file
//! - Pre-built in-memory query lists

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cpu_usage;
mod vec_source;

pub use cpu_usage::{CpuUsageCsvSource, CPU_USAGE_QUERY, DATE_TIME_FORMAT};
pub use vec_source::VecSource;
