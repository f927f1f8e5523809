//! Per-listener read cursor

use std::sync::Arc;

use tokio::sync::watch;

use super::buffer::{BroadcastBuffer, ReadChunk, WriteSignal};
use super::error::BufferError;

/// A listener's private read position in a [`BroadcastBuffer`]
///
/// Only the owning reader moves the cursor. Dropping it unregisters the
/// listener from the buffer.
pub struct ListenerCursor {
    id: u64,
    owner: String,
    start_offset: u64,
    pub(super) offset: u64,
    pub(super) last_title: Arc<str>,
    pub(super) signal: watch::Receiver<WriteSignal>,
    buffer: Arc<BroadcastBuffer>,
}

impl ListenerCursor {
    pub(super) fn new(
        id: u64,
        owner: String,
        offset: u64,
        signal: watch::Receiver<WriteSignal>,
        buffer: Arc<BroadcastBuffer>,
    ) -> Self {
        Self {
            id,
            owner,
            start_offset: offset,
            offset,
            last_title: Arc::from(""),
            signal,
            buffer,
        }
    }

    /// Read up to `max_len` bytes, see [`BroadcastBuffer::read`]
    pub async fn read(&mut self, max_len: usize) -> Result<ReadChunk, BufferError> {
        let buffer = Arc::clone(&self.buffer);
        buffer.read(self, max_len).await
    }

    /// Cursor ID, unique per buffer
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Client the cursor belongs to (diagnostics only)
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Absolute offset of the next byte to read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Write offset at the time the cursor was opened
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Bytes written but not yet read by this cursor
    pub fn lag(&self) -> u64 {
        self.buffer.write_offset().saturating_sub(self.offset)
    }

    /// The buffer this cursor reads from
    pub fn buffer(&self) -> &Arc<BroadcastBuffer> {
        &self.buffer
    }
}

impl Drop for ListenerCursor {
    fn drop(&mut self) {
        self.buffer.release_cursor(self.id);
    }
}

impl std::fmt::Debug for ListenerCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerCursor")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("offset", &self.offset)
            .finish()
    }
}
