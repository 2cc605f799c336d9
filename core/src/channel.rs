//! Channel configuration for dispatcher/worker communication

/// Default capacity of each worker's input queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Channel buffer configuration for dispatcher/worker communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelConfig {
    /// Capacity of each worker's input queue (dispatcher -> worker)
    pub queue_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom per-worker queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Upper bound on queries in flight for a pool of `pool_size` workers
    ///
    /// Seeding never admits more than this many queries, and admission after
    /// seeding is one-for-one with completions, so it bounds the whole run.
    pub fn max_in_flight(&self, pool_size: usize) -> usize {
        pool_size.max(1) * self.queue_capacity.max(1)
    }

    /// Capacity of the shared completion queue (workers -> dispatcher)
    ///
    /// Sized to hold every query that can be in flight, so a worker never
    /// blocks posting a result while the dispatcher is blocked enqueuing.
    pub fn completion_capacity(&self, pool_size: usize) -> usize {
        self.max_in_flight(pool_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.queue_capacity, 20);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_queue_capacity(5);
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.max_in_flight(4), 20);
        assert_eq!(config.completion_capacity(4), 20);
    }

    #[test]
    fn test_completion_capacity_never_zero() {
        let config = ChannelConfig::default().with_queue_capacity(0);
        assert_eq!(config.completion_capacity(0), 1);
    }
}
