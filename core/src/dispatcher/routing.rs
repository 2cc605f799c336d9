//! Sticky key-to-worker routing

use std::collections::HashMap;

/// Maps routing keys to worker ids for the lifetime of one run
///
/// The first time a key is seen it is assigned the worker under the
/// round-robin cursor; every later lookup returns that same worker. The table
/// is owned by the dispatcher and never shared with workers.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    assignments: HashMap<String, usize>,
    cursor: usize,
    pool_size: usize,
}

impl RoutingTable {
    /// Create an empty table for `pool_size` workers (clamped to at least 1)
    pub fn new(pool_size: usize) -> Self {
        Self {
            assignments: HashMap::new(),
            cursor: 0,
            pool_size: pool_size.max(1),
        }
    }

    /// Worker for `key`, assigning the next worker round-robin on first sight
    pub fn route(&mut self, key: &str) -> usize {
        if let Some(&worker_id) = self.assignments.get(key) {
            return worker_id;
        }

        let worker_id = self.cursor;
        self.cursor = (self.cursor + 1) % self.pool_size;
        self.assignments.insert(key.to_owned(), worker_id);
        worker_id
    }

    /// Worker already assigned to `key`, if any
    pub fn worker_for(&self, key: &str) -> Option<usize> {
        self.assignments.get(key).copied()
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether no key has been routed yet
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of workers keys are spread over
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}
