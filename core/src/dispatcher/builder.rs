//! Builder pattern for Dispatcher construction

use crate::channel::ChannelConfig;
use crate::config::{DebugConfig, DispatcherConfig};
use crate::error::{DispatchError, DispatchResult};

use super::executor::Dispatcher;

/// Builder for creating a Dispatcher with validated configuration
///
/// # Example
///
/// ```ignore
/// let mut dispatcher = DispatcherBuilder::new()
///     .pool_size(8)
///     .queue_capacity(20)
///     .debug(DebugConfig::parse("routing=1"))
///     .build()?;
/// ```
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create a new dispatcher builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
        }
    }

    /// Set the full dispatcher configuration
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of workers
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.config.pool_size = pool_size;
        self
    }

    /// Set the capacity of each worker's input queue
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.channel.queue_capacity = capacity;
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, channel: ChannelConfig) -> Self {
        self.config.channel = channel;
        self
    }

    /// Set the debug knobs
    pub fn debug(mut self, debug: DebugConfig) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    ///
    /// Returns an error if the pool size or queue capacity is zero.
    pub fn build(self) -> DispatchResult<Dispatcher> {
        self.config
            .validate()
            .map_err(|e| DispatchError::config(e.to_string()))?;

        Ok(Dispatcher::with_config(self.config))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
