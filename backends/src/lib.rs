//! Backend implementations for dbperf
//!
//! This crate provides implementations of the `Backend` trait for:
//!
//! - PostgreSQL / TimescaleDB (via `tokio-postgres`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod postgres;

pub use postgres::{ConnectionConfig, PostgresBackend};
