//! Shared mocks for worker and dispatcher tests

use crate::request::{Query, QueryArg};
use crate::traits::{Backend, BackendError, QuerySource, SourceError};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Mock Backend
// ============================================================================

pub struct MockBackend {
    delay: Option<Duration>,
    fail_on_call: Option<usize>,
    slow_failure: Option<(String, Duration)>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    executed: Mutex<Vec<(String, i64)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            delay: None,
            fail_on_call: None,
            slow_failure: None,
            gate: None,
            calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the n-th call (1-based)
    pub fn with_fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Fail every query for `key` after sleeping `delay`
    pub fn with_slow_failure(mut self, key: &str, delay: Duration) -> Self {
        self.slow_failure = Some((key.to_string(), delay));
        self
    }

    /// Block every execution until a permit is available on `gate`
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (key, sequence number) pairs in completion order
    pub fn executed(&self) -> Vec<(String, i64)> {
        self.executed.lock().unwrap().clone()
    }

    /// Sequence numbers executed for `key`, in execution order
    pub fn executed_for(&self, key: &str) -> Vec<i64> {
        self.executed()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, seq)| seq)
            .collect()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, query: &Query) -> Result<(), BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| BackendError::Connection("gate closed".into()))?
                .forget();
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((key, delay)) = &self.slow_failure {
            if query.key() == key {
                tokio::time::sleep(*delay).await;
                return Err(BackendError::Execution(format!("{key} failed")));
            }
        }

        if self.fail_on_call == Some(call) {
            return Err(BackendError::Execution("simulated failure".into()));
        }

        let seq = match query.args.first() {
            Some(QueryArg::Int(seq)) => *seq,
            _ => -1,
        };
        self.executed
            .lock()
            .unwrap()
            .push((query.key().to_string(), seq));

        Ok(())
    }
}

// ============================================================================
// Mock Sources
// ============================================================================

/// Yields the given keys in order; each query carries its position as `Int`
pub struct KeySource {
    queries: VecDeque<Query>,
    fail_after: Option<usize>,
    produced: usize,
}

impl KeySource {
    pub fn new(keys: &[&str]) -> Self {
        let queries = keys
            .iter()
            .enumerate()
            .map(|(i, key)| Query::new("EXEC", vec![QueryArg::Int(i as i64)], *key))
            .collect();
        Self {
            queries,
            fail_after: None,
            produced: 0,
        }
    }

    /// `n` distinct keys cycled over `total` queries
    pub fn cycling(n: usize, total: usize) -> Self {
        let keys: Vec<String> = (0..total).map(|i| format!("host_{}", i % n)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        Self::new(&refs)
    }

    /// Report a malformed record once `n` queries were produced
    pub fn with_fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn produced(&self) -> usize {
        self.produced
    }
}

impl QuerySource for KeySource {
    fn name(&self) -> &str {
        "keys"
    }

    fn next_query(&mut self) -> Result<Query, SourceError> {
        if self.fail_after == Some(self.produced) {
            return Err(SourceError::InvalidRecord("host_x,not-a-time".into()));
        }

        let query = self.queries.pop_front().ok_or(SourceError::Exhausted)?;
        self.produced += 1;
        Ok(query)
    }
}

pub fn query(key: &str, seq: i64) -> Query {
    Query::new("EXEC", vec![QueryArg::Int(seq)], key)
}
