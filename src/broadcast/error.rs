//! Broadcast buffer error types

use std::time::Duration;

/// Error type for broadcast buffer reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Reader fell more than the ring capacity behind the writer
    ///
    /// The cursor has already been moved to the oldest retained byte;
    /// reading may continue.
    Underrun {
        /// Bytes that were overwritten before the reader got to them
        skipped: u64,
    },
    /// No writes arrived while a reader was waiting
    EncoderStall {
        /// Time since the last write
        idle: Duration,
    },
    /// The broadcast has been stopped
    Closed,
}

impl BufferError {
    /// Whether reading can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BufferError::Underrun { .. })
    }
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::Underrun { skipped } => {
                write!(f, "Buffer underrun: {} bytes lost", skipped)
            }
            BufferError::EncoderStall { idle } => {
                write!(f, "Encoder stalled: no data for {:?}", idle)
            }
            BufferError::Closed => write!(f, "Broadcast closed"),
        }
    }
}

impl std::error::Error for BufferError {}
