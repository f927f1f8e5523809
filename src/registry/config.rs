//! Registry configuration

use std::time::Duration;

use crate::broadcast::BufferConfig;

/// Configuration for the [`BroadcastRegistry`](super::BroadcastRegistry)
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Configuration for newly started broadcast buffers
    pub buffer: BufferConfig,

    /// Remove a broadcast with no listeners and no writes for this long
    pub idle_timeout: Duration,

    /// How often the cleanup task runs
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            idle_timeout: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Set the buffer configuration
    pub fn buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
