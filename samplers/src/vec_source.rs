//! In-memory query source

use std::collections::VecDeque;

use dbperf_core::{Query, QuerySource, SourceError};

/// Yields a pre-built list of queries in order, then reports exhaustion
#[derive(Debug, Default)]
pub struct VecSource {
    queries: VecDeque<Query>,
}

impl VecSource {
    /// Create a source over `queries`
    pub fn new(queries: Vec<Query>) -> Self {
        Self {
            queries: queries.into(),
        }
    }

    /// Queries not yet handed out
    pub fn remaining(&self) -> usize {
        self.queries.len()
    }
}

impl From<Vec<Query>> for VecSource {
    fn from(queries: Vec<Query>) -> Self {
        Self::new(queries)
    }
}

impl QuerySource for VecSource {
    fn name(&self) -> &str {
        "vec"
    }

    fn next_query(&mut self) -> Result<Query, SourceError> {
        self.queries.pop_front().ok_or(SourceError::Exhausted)
    }
}
