//! Dispatcher configuration types

use crate::channel::ChannelConfig;
use serde::{Deserialize, Serialize};

/// Dispatcher configuration
///
/// Defines the shape of the worker pool for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of concurrent workers
    pub pool_size: usize,

    /// Queue sizing
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Debug knobs
    #[serde(default)]
    pub debug: DebugConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pool_size: 1,
            channel: ChannelConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Create a new config with the given pool size
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Default::default()
        }
    }

    /// Set the per-worker queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.channel.queue_capacity = capacity;
        self
    }

    /// Set the debug configuration
    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = debug;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize(
                "pool size must be at least 1".into(),
            ));
        }

        if self.channel.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(
                "queue capacity must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Debug knobs, parsed once at process start
///
/// The textual form is a comma-separated list of `name=value` pairs, e.g.
/// `routing=1,progress=1000`. Unknown names, fields without `=`, and values
/// that are not integers are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log every routing decision
    pub log_routing: bool,

    /// Log a progress line every N completions (0 disables)
    pub progress_every: u64,
}

impl DebugConfig {
    /// Parse a `name=value,...` debug string
    pub fn parse(input: &str) -> Self {
        let mut config = Self::default();

        for field in input.split(',') {
            let Some((name, value)) = field.split_once('=') else {
                continue;
            };
            let Ok(value) = value.trim().parse::<i64>() else {
                continue;
            };

            match name.trim() {
                "routing" => config.log_routing = value > 0,
                "progress" => config.progress_every = value.max(0) as u64,
                _ => {}
            }
        }

        config
    }

    /// Whether any knob is enabled
    pub fn is_enabled(&self) -> bool {
        self.log_routing || self.progress_every > 0
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid pool size
    #[error("Invalid pool size: {0}")]
    InvalidPoolSize(String),

    /// Invalid queue capacity
    #[error("Invalid queue capacity: {0}")]
    InvalidQueueCapacity(String),
}
