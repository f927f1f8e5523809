//! Broadcast registry implementation
//!
//! The central registry that owns every live broadcast buffer, so encoders
//! and listener sessions for the same channel and format meet on one buffer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{BroadcastEntry, BroadcastState};
use super::error::RegistryError;
use super::key::StreamKey;
use crate::broadcast::BroadcastBuffer;
use crate::stats::BufferStats;

/// Central registry for all active broadcasts
///
/// Thread-safe via `RwLock`. Listener joins only need read access.
pub struct BroadcastRegistry {
    /// Map of stream key to broadcast entry
    streams: RwLock<HashMap<StreamKey, BroadcastEntry>>,

    /// Configuration
    config: RegistryConfig,
}

impl BroadcastRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Start a broadcast
    ///
    /// A stopped broadcast under the same key is replaced. Returns an error
    /// if a running one exists.
    pub async fn start_broadcast(
        &self,
        key: StreamKey,
    ) -> Result<Arc<BroadcastBuffer>, RegistryError> {
        let mut streams = self.streams.write().await;

        if let Some(entry) = streams.get(&key) {
            if !entry.buffer.is_stopped() {
                return Err(RegistryError::AlreadyBroadcasting(key));
            }
        }

        let buffer = Arc::new(BroadcastBuffer::new(key.format, self.config.buffer.clone()));
        streams.insert(key, BroadcastEntry::new(Arc::clone(&buffer)));

        tracing::info!(
            stream = %key,
            capacity = buffer.capacity(),
            streams = streams.len(),
            "Broadcast started"
        );

        Ok(buffer)
    }

    /// Get a running broadcast
    pub async fn get(&self, key: &StreamKey) -> Result<Arc<BroadcastBuffer>, RegistryError> {
        let streams = self.streams.read().await;

        streams
            .get(key)
            .filter(|entry| !entry.buffer.is_stopped())
            .map(|entry| Arc::clone(&entry.buffer))
            .ok_or(RegistryError::StreamNotFound(*key))
    }

    /// Get a running broadcast, starting it if needed
    ///
    /// Returns the buffer and whether it was newly started, so the caller
    /// knows to attach an encoder.
    pub async fn get_or_start(&self, key: StreamKey) -> (Arc<BroadcastBuffer>, bool) {
        if let Ok(buffer) = self.get(&key).await {
            return (buffer, false);
        }

        // Check again under the write lock; another task may have started it
        let mut streams = self.streams.write().await;
        if let Some(entry) = streams.get(&key) {
            if !entry.buffer.is_stopped() {
                return (Arc::clone(&entry.buffer), false);
            }
        }

        let buffer = Arc::new(BroadcastBuffer::new(key.format, self.config.buffer.clone()));
        streams.insert(key, BroadcastEntry::new(Arc::clone(&buffer)));

        tracing::info!(
            stream = %key,
            capacity = buffer.capacity(),
            streams = streams.len(),
            "Broadcast started"
        );

        (buffer, true)
    }

    /// Stop and remove a broadcast
    ///
    /// Every listener cursor on it drains and then sees the end of stream.
    pub async fn stop_broadcast(&self, key: &StreamKey) -> Result<(), RegistryError> {
        let entry = self
            .streams
            .write()
            .await
            .remove(key)
            .ok_or(RegistryError::StreamNotFound(*key))?;

        entry.buffer.stop();
        tracing::info!(
            stream = %key,
            uptime_secs = entry.uptime().as_secs(),
            "Broadcast removed"
        );

        Ok(())
    }

    /// Channel IDs with at least one running broadcast, sorted
    pub async fn channel_ids(&self) -> Vec<u64> {
        let streams = self.streams.read().await;

        let mut ids: Vec<u64> = streams
            .iter()
            .filter(|(_, entry)| !entry.buffer.is_stopped())
            .map(|(key, _)| key.channel_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Get broadcast statistics
    pub async fn stats(&self, key: &StreamKey) -> Option<BufferStats> {
        let streams = self.streams.read().await;
        streams.get(key).map(|entry| entry.buffer.stats())
    }

    /// Get the state of a broadcast
    pub async fn state(&self, key: &StreamKey) -> Option<BroadcastState> {
        let streams = self.streams.read().await;
        streams.get(key).map(|entry| entry.state(self.config.idle_timeout))
    }

    /// Get total number of broadcasts
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Run cleanup once
    ///
    /// Removes broadcasts that are stopped, or idle (no listeners and no
    /// writes) for longer than `idle_timeout`.
    pub async fn cleanup(&self) {
        let mut streams = self.streams.write().await;
        let idle_timeout = self.config.idle_timeout;

        streams.retain(|key, entry| match entry.state(idle_timeout) {
            BroadcastState::Live => true,
            state => {
                entry.buffer.stop();
                tracing::info!(stream = %key, state = ?state, "Broadcast removed by cleanup");
                false
            }
        });
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }
}

impl Default for BroadcastRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::broadcast::BufferError;
    use crate::media::{AudioFormat, Codec};

    fn key(channel_id: u64) -> StreamKey {
        StreamKey::new(channel_id, AudioFormat::default())
    }

    #[tokio::test]
    async fn test_start_broadcast() {
        let registry = BroadcastRegistry::new();

        let buffer = registry.start_broadcast(key(1)).await.unwrap();
        assert!(Arc::ptr_eq(&buffer, &registry.get(&key(1)).await.unwrap()));

        // Can't start it twice
        let result = registry.start_broadcast(key(1)).await;
        assert_eq!(result.unwrap_err(), RegistryError::AlreadyBroadcasting(key(1)));

        // Same channel, other format is a separate broadcast
        let aac = StreamKey::new(1, AudioFormat::new(Codec::Aac, 64));
        registry.start_broadcast(aac).await.unwrap();
        assert_eq!(registry.stream_count().await, 2);
        assert_eq!(registry.channel_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_get_or_start() {
        let registry = BroadcastRegistry::new();

        let (first, started) = registry.get_or_start(key(5)).await;
        assert!(started);

        let (second, started) = registry.get_or_start(key(5)).await;
        assert!(!started);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_start_shares_one_buffer() {
        let registry = Arc::new(BroadcastRegistry::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_start(key(9)).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        let started = results.iter().filter(|(_, started)| *started).count();
        assert_eq!(started, 1);

        let live = registry.get(&key(9)).await.unwrap();
        assert!(results.iter().all(|(buffer, _)| Arc::ptr_eq(buffer, &live)));
        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_start_replaces_stopped_broadcast() {
        let registry = BroadcastRegistry::new();
        let (old, _) = registry.get_or_start(key(6)).await;
        old.stop();

        let (new, started) = registry.get_or_start(key(6)).await;
        assert!(started);
        assert!(!Arc::ptr_eq(&old, &new));
    }

    #[tokio::test]
    async fn test_stop_broadcast_ends_listeners() {
        let registry = BroadcastRegistry::new();
        let buffer = registry.start_broadcast(key(2)).await.unwrap();
        let mut cursor = buffer.open_cursor("listener").unwrap();

        registry.stop_broadcast(&key(2)).await.unwrap();

        assert_eq!(cursor.read(16).await.unwrap_err(), BufferError::Closed);
        assert_eq!(
            registry.get(&key(2)).await.unwrap_err(),
            RegistryError::StreamNotFound(key(2))
        );
        assert!(registry.stop_broadcast(&key(2)).await.is_err());

        // The key can be reused
        registry.start_broadcast(key(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = BroadcastRegistry::new();
        let buffer = registry.start_broadcast(key(3)).await.unwrap();
        let _cursor = buffer.open_cursor("listener").unwrap();

        buffer.write(&[0u8; 100]).unwrap();
        buffer.set_title("Now Playing");

        let stats = registry.stats(&key(3)).await.unwrap();
        assert_eq!(stats.write_offset, 100);
        assert_eq!(stats.listener_count, 1);
        assert_eq!(stats.title, "Now Playing");
        assert!(!stats.stopped);

        assert!(registry.stats(&key(99)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_idle_broadcasts() {
        let config = RegistryConfig::default().idle_timeout(Duration::from_secs(30));
        let registry = BroadcastRegistry::with_config(config);

        let idle = registry.start_broadcast(key(1)).await.unwrap();
        let busy = registry.start_broadcast(key(2)).await.unwrap();
        let _cursor = busy.open_cursor("listener").unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(registry.state(&key(1)).await, Some(BroadcastState::Idle));
        assert_eq!(registry.state(&key(2)).await, Some(BroadcastState::Live));

        registry.cleanup().await;

        assert_eq!(registry.stream_count().await, 1);
        assert!(idle.is_stopped());
        assert!(registry.get(&key(2)).await.is_ok());
    }
}
