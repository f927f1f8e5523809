//! Single-writer, multi-reader broadcast ring
//!
//! The encoder appends bytes with [`BroadcastBuffer::write`], which never waits
//! on listeners. Each listener owns a [`ListenerCursor`] holding its absolute
//! read offset. Offsets grow without bound; the ring keeps only the most recent
//! `capacity` bytes, so a cursor is valid while `W - capacity <= o <= W`.
//!
//! ```text
//!            oldest retained                      W (write offset)
//!                  │                                  │
//!   ...lost...     ▼      ring (capacity bytes)       ▼
//!               ┌──────────────────────────────────────┐
//!               │██████████████████████████████████████│
//!               └──────▲───────────────▲───────────────┘
//!                      │               │
//!                 cursor A        cursor B
//! ```
//!
//! Waiting readers are woken through a `tokio::sync::watch` channel carrying
//! the write offset, so a reader with nothing to read parks until the next
//! write, a stop, or the stall deadline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::{Bytes, BytesMut};
use tokio::sync::watch;
use tokio::time::Instant;

use super::config::BufferConfig;
use super::cursor::ListenerCursor;
use super::error::BufferError;
use crate::media::AudioFormat;
use crate::stats::BufferStats;

/// Write progress published to waiting readers
#[derive(Debug, Clone, Copy)]
pub(super) struct WriteSignal {
    pub(super) offset: u64,
    pub(super) closed: bool,
}

/// Bytes returned by a cursor read
#[derive(Debug, Clone)]
pub struct ReadChunk {
    /// Absolute offset of the first byte in `data`
    pub offset: u64,
    /// Payload bytes
    pub data: Bytes,
    /// New title, if it changed since this cursor's previous read
    pub title: Option<Arc<str>>,
}

struct Ring {
    data: Box<[u8]>,
    write_offset: u64,
    last_write_at: Instant,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            write_offset: 0,
            last_write_at: Instant::now(),
        }
    }

    fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    /// Oldest offset still held in the ring
    fn tail(&self) -> u64 {
        self.write_offset.saturating_sub(self.capacity())
    }

    fn push(&mut self, chunk: &[u8]) {
        let capacity = self.data.len();

        // Only the last `capacity` bytes of an oversized chunk survive
        let skip = chunk.len().saturating_sub(capacity);
        let src = &chunk[skip..];
        let start = ((self.write_offset + skip as u64) % self.capacity()) as usize;

        let first = src.len().min(capacity - start);
        self.data[start..start + first].copy_from_slice(&src[..first]);
        self.data[..src.len() - first].copy_from_slice(&src[first..]);

        self.write_offset += chunk.len() as u64;
        self.last_write_at = Instant::now();
    }

    /// Copy `len` bytes starting at absolute `offset`
    ///
    /// Caller guarantees `tail() <= offset` and `offset + len <= write_offset`.
    fn copy_from(&self, offset: u64, len: usize) -> Bytes {
        let capacity = self.data.len();
        let start = (offset % self.capacity()) as usize;
        let first = len.min(capacity - start);

        let mut out = BytesMut::with_capacity(len);
        out.extend_from_slice(&self.data[start..start + first]);
        out.extend_from_slice(&self.data[..len - first]);
        out.freeze()
    }
}

/// Broadcast fan-out buffer for one live stream
pub struct BroadcastBuffer {
    config: BufferConfig,
    format: AudioFormat,
    ring: RwLock<Ring>,
    title: RwLock<Arc<str>>,
    signal: watch::Sender<WriteSignal>,
    listeners: Mutex<HashMap<u64, String>>,
    next_cursor_id: AtomicU64,
    created_at: Instant,
}

impl BroadcastBuffer {
    /// Create a new broadcast buffer
    pub fn new(format: AudioFormat, config: BufferConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (signal, _) = watch::channel(WriteSignal {
            offset: 0,
            closed: false,
        });
        let title: Arc<str> = Arc::from(config.initial_title.as_str());

        Self {
            format,
            ring: RwLock::new(Ring::new(capacity)),
            title: RwLock::new(title),
            signal,
            listeners: Mutex::new(HashMap::new()),
            next_cursor_id: AtomicU64::new(1),
            created_at: Instant::now(),
            config,
        }
    }

    /// Get the buffer configuration
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Station name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Format declared by the encoder feeding this buffer
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Ring capacity in bytes
    pub fn capacity(&self) -> usize {
        self.read_ring().data.len()
    }

    /// Current write offset (total bytes ever written)
    pub fn write_offset(&self) -> u64 {
        self.read_ring().write_offset
    }

    /// Append bytes to the broadcast
    ///
    /// Never waits for readers; bytes that fall out of the ring are lost to
    /// any cursor that had not read them yet. Returns the new write offset.
    pub fn write(&self, chunk: &[u8]) -> Result<u64, BufferError> {
        if self.is_stopped() {
            return Err(BufferError::Closed);
        }

        let offset = {
            let mut ring = self.write_ring();
            if !chunk.is_empty() {
                ring.push(chunk);
            }
            ring.write_offset
        };

        if !chunk.is_empty() {
            self.signal.send_modify(|signal| signal.offset = offset);
        }

        Ok(offset)
    }

    /// Replace the current title
    ///
    /// Readers pick the change up on their next read.
    pub fn set_title(&self, title: &str) {
        let mut current = self.title.write().unwrap_or_else(PoisonError::into_inner);
        if **current != *title {
            tracing::debug!(title = title, "Broadcast title changed");
            *current = Arc::from(title);
        }
    }

    /// Get the current title
    pub fn title(&self) -> Arc<str> {
        Arc::clone(&self.title.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Open a cursor at the current write offset
    ///
    /// Late joiners never receive data written before they joined.
    pub fn open_cursor(self: &Arc<Self>, owner: impl Into<String>) -> Result<ListenerCursor, BufferError> {
        if self.is_stopped() {
            return Err(BufferError::Closed);
        }

        let owner = owner.into();
        let id = self.next_cursor_id.fetch_add(1, Ordering::Relaxed);
        let offset = self.write_offset();

        let count = {
            let mut listeners = self.lock_listeners();
            listeners.insert(id, owner.clone());
            listeners.len()
        };

        tracing::debug!(
            cursor = id,
            owner = %owner,
            offset = offset,
            listeners = count,
            "Cursor opened"
        );

        Ok(ListenerCursor::new(
            id,
            owner,
            offset,
            self.signal.subscribe(),
            Arc::clone(self),
        ))
    }

    /// Read up to `max_len` bytes at the cursor position
    ///
    /// Waits for the writer when the cursor is caught up. Fails with
    /// [`BufferError::Underrun`] after moving the cursor to the oldest retained
    /// byte if it fell more than the capacity behind, with
    /// [`BufferError::EncoderStall`] if nothing was written within the stall
    /// timeout, and with [`BufferError::Closed`] once the broadcast is stopped
    /// and the cursor has drained what remains.
    pub async fn read(
        &self,
        cursor: &mut ListenerCursor,
        max_len: usize,
    ) -> Result<ReadChunk, BufferError> {
        debug_assert!(std::ptr::eq(self, Arc::as_ptr(cursor.buffer())));

        loop {
            let (wait_from, deadline) = {
                let ring = self.read_ring();
                let behind = ring.write_offset - cursor.offset;

                if behind > ring.capacity() {
                    let skipped = ring.tail() - cursor.offset;
                    cursor.offset = ring.tail();
                    return Err(BufferError::Underrun { skipped });
                }

                if behind > 0 || max_len == 0 {
                    let len = max_len.min(behind as usize);
                    let offset = cursor.offset;
                    let data = ring.copy_from(offset, len);
                    cursor.offset += len as u64;
                    drop(ring);

                    return Ok(ReadChunk {
                        offset,
                        data,
                        title: self.observe_title(cursor),
                    });
                }

                if self.is_stopped() {
                    return Err(BufferError::Closed);
                }

                // Every wait gets a full stall window, even after a reported stall
                let since = ring.last_write_at.max(Instant::now());
                (cursor.offset, since + self.config.stall_timeout)
            };

            let woke = tokio::time::timeout_at(
                deadline,
                cursor
                    .signal
                    .wait_for(|signal| signal.offset > wait_from || signal.closed),
            )
            .await
            .map(|changed| changed.is_ok());

            match woke {
                Ok(true) => continue,
                Ok(false) => return Err(BufferError::Closed),
                Err(_) => {
                    let idle = self.read_ring().last_write_at.elapsed();
                    return Err(BufferError::EncoderStall { idle });
                }
            }
        }
    }

    fn observe_title(&self, cursor: &mut ListenerCursor) -> Option<Arc<str>> {
        let title = self.title();
        if *title == *cursor.last_title {
            return None;
        }
        cursor.last_title = Arc::clone(&title);
        Some(title)
    }

    /// Stop the broadcast
    ///
    /// Writes fail from now on. Cursors drain what is left, then get
    /// [`BufferError::Closed`].
    pub fn stop(&self) {
        let mut was_open = false;
        self.signal.send_if_modified(|signal| {
            was_open = !signal.closed;
            signal.closed = true;
            was_open
        });

        if was_open {
            tracing::info!(
                written = self.write_offset(),
                listeners = self.listener_count(),
                "Broadcast stopped"
            );
        }
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.signal.borrow().closed
    }

    /// Number of open cursors
    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    /// Open cursors as `(cursor id, owner)` pairs, ordered by id
    pub fn listeners(&self) -> Vec<(u64, String)> {
        let mut listeners: Vec<_> = self
            .lock_listeners()
            .iter()
            .map(|(id, owner)| (*id, owner.clone()))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);
        listeners
    }

    /// Time since the last write (or creation, if nothing was written yet)
    pub fn idle_time(&self) -> std::time::Duration {
        self.read_ring().last_write_at.elapsed()
    }

    /// Time since the buffer was created
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Snapshot of buffer statistics
    pub fn stats(&self) -> BufferStats {
        let (capacity, write_offset, retained, idle) = {
            let ring = self.read_ring();
            (
                ring.data.len(),
                ring.write_offset,
                ring.write_offset - ring.tail(),
                ring.last_write_at.elapsed(),
            )
        };

        BufferStats {
            capacity,
            write_offset,
            retained_bytes: retained as usize,
            listener_count: self.listener_count(),
            title: self.title().to_string(),
            idle,
            stopped: self.is_stopped(),
        }
    }

    pub(super) fn release_cursor(&self, id: u64) {
        let remaining = {
            let mut listeners = self.lock_listeners();
            listeners.remove(&id);
            listeners.len()
        };
        tracing::debug!(cursor = id, listeners = remaining, "Cursor released");
    }

    fn read_ring(&self) -> RwLockReadGuard<'_, Ring> {
        self.ring.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_ring(&self) -> RwLockWriteGuard<'_, Ring> {
        self.ring.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, HashMap<u64, String>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BroadcastBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastBuffer")
            .field("format", &self.format)
            .field("capacity", &self.capacity())
            .field("write_offset", &self.write_offset())
            .field("listeners", &self.listener_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready};

    use super::*;

    fn buffer(capacity: usize) -> Arc<BroadcastBuffer> {
        Arc::new(BroadcastBuffer::new(
            AudioFormat::default(),
            BufferConfig::default().capacity(capacity),
        ))
    }

    #[tokio::test]
    async fn test_late_joiner_gets_no_backlog() {
        let buffer = buffer(100_000);
        buffer.write(&vec![1u8; 70_000]).unwrap();

        let mut cursor = buffer.open_cursor("late").unwrap();
        assert_eq!(cursor.offset(), 70_000);

        buffer.write(&[2, 3, 4]).unwrap();
        let chunk = cursor.read(4096).await.unwrap();

        assert_eq!(chunk.offset, 70_000);
        assert_eq!(&chunk.data[..], &[2, 3, 4]);
        assert_eq!(cursor.offset(), 70_003);
    }

    #[tokio::test]
    async fn test_cursors_see_identical_bytes() {
        let buffer = buffer(64);
        let mut early = buffer.open_cursor("early").unwrap();

        buffer.write(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let mut late = buffer.open_cursor("late").unwrap();
        buffer.write(&[8, 9, 10, 11]).unwrap();

        let mut seen_early = Vec::new();
        while early.offset() < buffer.write_offset() {
            seen_early.extend_from_slice(&early.read(3).await.unwrap().data);
        }
        let seen_late = late.read(64).await.unwrap().data;

        assert_eq!(seen_early, (0u8..12).collect::<Vec<_>>());
        assert_eq!(&seen_late[..], &seen_early[8..]);
    }

    #[tokio::test]
    async fn test_ring_wraps() {
        let buffer = buffer(8);
        let mut cursor = buffer.open_cursor("wrap").unwrap();

        buffer.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(&cursor.read(6).await.unwrap().data[..], &[1, 2, 3, 4, 5, 6]);

        // Straddles the end of the ring
        buffer.write(&[7, 8, 9, 10, 11]).unwrap();
        assert_eq!(&cursor.read(16).await.unwrap().data[..], &[7, 8, 9, 10, 11]);
    }

    #[tokio::test]
    async fn test_underrun_resyncs_cursor() {
        let buffer = buffer(10);
        let mut cursor = buffer.open_cursor("slow").unwrap();

        buffer.write(&(0u8..25).collect::<Vec<_>>()).unwrap();

        let err = cursor.read(100).await.unwrap_err();
        assert_eq!(err, BufferError::Underrun { skipped: 15 });
        assert_eq!(cursor.offset(), 15);

        // Reading resumes from the oldest retained byte
        let chunk = cursor.read(100).await.unwrap();
        assert_eq!(chunk.offset, 15);
        assert_eq!(&chunk.data[..], &(15u8..25).collect::<Vec<_>>()[..]);
    }

    #[tokio::test]
    async fn test_exactly_capacity_behind_is_not_underrun() {
        let buffer = buffer(10);
        let mut cursor = buffer.open_cursor("edge").unwrap();

        buffer.write(&[7u8; 10]).unwrap();
        let chunk = cursor.read(100).await.unwrap();
        assert_eq!(chunk.data.len(), 10);
    }

    #[tokio::test]
    async fn test_read_waits_for_writer() {
        let buffer = buffer(64);
        let mut cursor = buffer.open_cursor("waiter").unwrap();

        let mut read = tokio_test::task::spawn(cursor.read(16));
        assert_pending!(read.poll());

        buffer.write(&[42]).unwrap();
        assert!(read.is_woken());

        let chunk = assert_ready!(read.poll()).unwrap();
        assert_eq!(&chunk.data[..], &[42]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_encoder_stall() {
        let buffer = Arc::new(BroadcastBuffer::new(
            AudioFormat::default(),
            BufferConfig::default().stall_timeout(Duration::from_secs(2)),
        ));
        let mut cursor = buffer.open_cursor("stalled").unwrap();

        let err = cursor.read(16).await.unwrap_err();
        assert!(matches!(err, BufferError::EncoderStall { idle } if idle >= Duration::from_secs(2)));
        assert!(!err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_stall_waits_full_timeout() {
        let buffer = Arc::new(BroadcastBuffer::new(
            AudioFormat::default(),
            BufferConfig::default().stall_timeout(Duration::from_secs(2)),
        ));
        let mut cursor = buffer.open_cursor("stalled").unwrap();

        assert!(matches!(cursor.read(16).await, Err(BufferError::EncoderStall { .. })));

        // The encoder is still silent: the next read waits again instead of failing at once
        let started = Instant::now();
        assert!(matches!(cursor.read(16).await, Err(BufferError::EncoderStall { .. })));
        assert!(started.elapsed() >= Duration::from_secs(2));

        let mut read = tokio_test::task::spawn(cursor.read(16));
        assert_pending!(read.poll());
        buffer.write(&[7]).unwrap();
        assert!(read.is_woken());
        assert_eq!(&assert_ready!(read.poll()).unwrap().data[..], &[7]);
    }

    #[tokio::test]
    async fn test_stop_drains_then_closes() {
        let buffer = buffer(64);
        let mut cursor = buffer.open_cursor("drain").unwrap();

        buffer.write(&[1, 2]).unwrap();
        buffer.stop();

        assert_eq!(buffer.write(&[3]), Err(BufferError::Closed));
        assert_eq!(&cursor.read(16).await.unwrap().data[..], &[1, 2]);
        assert_eq!(cursor.read(16).await.unwrap_err(), BufferError::Closed);
        assert!(buffer.open_cursor("too late").is_err());
    }

    #[tokio::test]
    async fn test_stop_wakes_waiting_reader() {
        let buffer = buffer(64);
        let mut cursor = buffer.open_cursor("waiter").unwrap();

        let reader = tokio::spawn(async move { cursor.read(16).await });
        tokio::task::yield_now().await;
        buffer.stop();

        assert_eq!(reader.await.unwrap().unwrap_err(), BufferError::Closed);
    }

    #[tokio::test]
    async fn test_title_observed_on_next_read() {
        let buffer = buffer(64);
        let mut cursor = buffer.open_cursor("titles").unwrap();

        buffer.write(&[1]).unwrap();
        assert!(cursor.read(16).await.unwrap().title.is_none());

        buffer.set_title("Song A");
        buffer.write(&[2]).unwrap();
        let chunk = cursor.read(16).await.unwrap();
        assert_eq!(chunk.title.as_deref(), Some("Song A"));

        buffer.write(&[3]).unwrap();
        assert!(cursor.read(16).await.unwrap().title.is_none());
        assert_eq!(&*buffer.title(), "Song A");
    }

    #[tokio::test]
    async fn test_cursor_release_on_drop() {
        let buffer = buffer(64);
        let a = buffer.open_cursor("10.0.0.1").unwrap();
        let b = buffer.open_cursor("10.0.0.2").unwrap();

        assert_eq!(buffer.listener_count(), 2);
        assert_eq!(
            buffer.listeners(),
            vec![(a.id(), "10.0.0.1".to_string()), (b.id(), "10.0.0.2".to_string())]
        );

        drop(a);
        assert_eq!(buffer.listener_count(), 1);
        drop(b);
        assert_eq!(buffer.stats().listener_count, 0);
    }

    #[tokio::test]
    async fn test_oversized_write_keeps_tail() {
        let buffer = buffer(4);
        buffer.write(&[0, 0, 0]).unwrap();
        let mut cursor = buffer.open_cursor("tail").unwrap();

        buffer.write(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(
            cursor.read(16).await.unwrap_err(),
            BufferError::Underrun { skipped: 2 }
        );
        assert_eq!(&cursor.read(16).await.unwrap().data[..], &[3, 4, 5, 6]);

        let stats = buffer.stats();
        assert_eq!(stats.write_offset, 9);
        assert_eq!(stats.retained_bytes, 4);
    }
}
