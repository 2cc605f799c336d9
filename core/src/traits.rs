//! Core traits for backends and query sources
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (backends/, samplers/).

use crate::request::Query;
use async_trait::async_trait;

// ============================================================================
// Backend Trait
// ============================================================================

/// Capability used to execute a query
///
/// A single instance is shared by every worker through an `Arc`, so
/// implementations must tolerate concurrent calls to [`Backend::execute`].
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend identifier (e.g., "postgres")
    fn name(&self) -> &str;

    /// Execute a query without returning rows
    async fn execute(&self, query: &Query) -> Result<(), BackendError>;
}

/// Backend-specific errors
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Connection could not be established or was lost
    #[error("connection error: {0}")]
    Connection(String),

    /// The statement was rejected or failed while executing
    #[error("execution error: {0}")]
    Execution(String),
}

// ============================================================================
// Query Source Trait
// ============================================================================

/// Produces the finite stream of queries for a run
///
/// The source is owned by the dispatcher for the length of a run and is only
/// ever polled from the dispatcher's task.
pub trait QuerySource: Send {
    /// Source name for identification
    fn name(&self) -> &str;

    /// Produce the next query
    ///
    /// Returns `SourceError::Exhausted` once no more queries remain. Any other
    /// error means the input is malformed and the run must stop.
    fn next_query(&mut self) -> Result<Query, SourceError>;
}

/// Source-specific errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No more queries, normal end of input
    #[error("source exhausted")]
    Exhausted,

    /// A record could not be turned into a query
    #[error("invalid query specification: {0}")]
    InvalidRecord(String),

    /// IO error (e.g., reading the input file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether this is the normal end-of-input signal
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SourceError::Exhausted)
    }
}
