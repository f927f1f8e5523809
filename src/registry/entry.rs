//! Broadcast entry and state types

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::broadcast::BroadcastBuffer;

/// State of a broadcast entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    /// Encoder writing or listeners connected
    Live,
    /// No listeners and no writes within the idle timeout
    Idle,
    /// Buffer stopped, waiting for cleanup
    Stopped,
}

/// Entry for a single broadcast in the registry
pub struct BroadcastEntry {
    /// The fan-out buffer
    pub buffer: Arc<BroadcastBuffer>,

    /// When the broadcast was started
    pub started_at: Instant,
}

impl BroadcastEntry {
    pub(super) fn new(buffer: Arc<BroadcastBuffer>) -> Self {
        Self {
            buffer,
            started_at: Instant::now(),
        }
    }

    /// Classify the broadcast against an idle timeout
    pub fn state(&self, idle_timeout: Duration) -> BroadcastState {
        if self.buffer.is_stopped() {
            BroadcastState::Stopped
        } else if self.buffer.listener_count() == 0 && self.buffer.idle_time() > idle_timeout {
            BroadcastState::Idle
        } else {
            BroadcastState::Live
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
