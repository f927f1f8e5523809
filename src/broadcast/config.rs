//! Broadcast buffer configuration

use std::time::Duration;

/// Configuration for a [`BroadcastBuffer`](super::BroadcastBuffer)
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Station name announced to listeners
    pub name: String,

    /// Ring capacity in bytes
    pub capacity: usize,

    /// How long a waiting reader tolerates no writes before reporting an encoder stall
    pub stall_timeout: Duration,

    /// Title the broadcast starts with (empty = unset)
    pub initial_title: String,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            name: "radiocast".to_string(),
            capacity: 256 * 1024, // 256KB, ~16s at 128kbps
            stall_timeout: Duration::from_secs(10),
            initial_title: String::new(),
        }
    }
}

impl BufferConfig {
    /// Set the station name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the ring capacity (minimum 1 byte)
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Set the encoder stall timeout
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the initial title
    pub fn initial_title(mut self, title: impl Into<String>) -> Self {
        self.initial_title = title.into();
        self
    }
}
