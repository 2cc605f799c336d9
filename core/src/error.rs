//! Error types for dbperf-core

use std::time::Duration;

use thiserror::Error;

pub use crate::traits::{BackendError, SourceError};

/// Error returned by a dispatcher run
///
/// Every variant is fatal: a run that ends with one of these produces no
/// statistics.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The query source reported malformed input or failed to read
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The backend rejected or failed a query
    #[error("query execution failed on worker {worker_id}: {source}")]
    Execution {
        /// Worker that executed the failing query
        worker_id: usize,
        /// Backend error
        #[source]
        source: BackendError,
    },

    /// The caller cancelled the run
    #[error("run cancelled")]
    Cancelled,

    /// The run deadline expired
    #[error("run timed out after {0:?}")]
    TimedOut(Duration),

    /// Invalid dispatcher configuration or misuse
    #[error("configuration error: {0}")]
    Config(String),

    /// A worker task died or one of its channels closed unexpectedly
    #[error("worker {worker_id} failed: {message}")]
    Worker {
        /// Worker identifier
        worker_id: usize,
        /// Failure description
        message: String,
    },

    /// A worker task could not be joined
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DispatchError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing-configuration error for a builder field
    pub fn missing_config(field: &str) -> Self {
        Self::Config(format!("missing required field: {field}"))
    }

    /// Create a worker failure error
    pub fn worker(worker_id: usize, message: impl Into<String>) -> Self {
        Self::Worker {
            worker_id,
            message: message.into(),
        }
    }

    /// Whether this error came from an external cancellation or deadline
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut(_))
    }
}

/// Result type alias
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_message() {
        let err = DispatchError::Execution {
            worker_id: 3,
            source: BackendError::Execution("relation \"cpu_usage\" does not exist".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("worker 3"));
        assert!(msg.contains("cpu_usage"));
    }

    #[test]
    fn test_source_error_is_transparent() {
        let err: DispatchError =
            SourceError::InvalidRecord("a,b".into()).into();
        assert_eq!(err.to_string(), "invalid query specification: a,b");
    }

    #[test]
    fn test_is_cancellation() {
        assert!(DispatchError::Cancelled.is_cancellation());
        assert!(DispatchError::TimedOut(Duration::from_secs(1)).is_cancellation());
        assert!(!DispatchError::config("bad").is_cancellation());
    }

    #[test]
    fn test_missing_config_names_field() {
        let err = DispatchError::missing_config("backend");
        assert!(err.to_string().contains("backend"));
    }
}
