//! File-backed broadcast origin
//!
//! Pumps a pre-encoded file into a [`BroadcastBuffer`], optionally at the
//! format's real-time byte rate after an initial burst so freshly joined
//! listeners fill their players quickly.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::buffer::BroadcastBuffer;
use super::error::BufferError;
use crate::error::Result;
use crate::shared_file::SharedFileStream;

/// Configuration for a [`FileFeeder`]
#[derive(Debug, Clone)]
pub struct FeederConfig {
    /// Bytes read from the file per write
    pub chunk_size: usize,

    /// Pace writes at the format's bitrate
    pub realtime: bool,

    /// Audio duration delivered ahead of real time before pacing starts
    pub startup_burst: Duration,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            realtime: true,
            startup_burst: Duration::from_millis(2500),
        }
    }
}

impl FeederConfig {
    /// Set the read size (minimum 1 byte)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Write as fast as the file can be read
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    /// Set the startup burst
    pub fn startup_burst(mut self, burst: Duration) -> Self {
        self.startup_burst = burst;
        self
    }
}

/// Feeds files into a broadcast
pub struct FileFeeder {
    buffer: Arc<BroadcastBuffer>,
    config: FeederConfig,
}

impl FileFeeder {
    pub fn new(buffer: Arc<BroadcastBuffer>, config: FeederConfig) -> Self {
        Self { buffer, config }
    }

    pub fn buffer(&self) -> &Arc<BroadcastBuffer> {
        &self.buffer
    }

    /// Feed `stream` from its current position to end of file
    ///
    /// Sets the broadcast title first when one is given. Returns the number of
    /// bytes written; stops early without error if the broadcast is stopped.
    pub async fn feed(&self, stream: &mut SharedFileStream, title: Option<&str>) -> Result<u64> {
        if let Some(title) = title {
            self.buffer.set_title(title);
        }

        let byte_rate = self.buffer.format().byte_rate().max(1);
        let started = Instant::now();
        let mut fed: u64 = 0;

        loop {
            let chunk = stream.read_chunk(self.config.chunk_size).await?;
            if chunk.is_empty() {
                break;
            }

            match self.buffer.write(&chunk) {
                Ok(_) => fed += chunk.len() as u64,
                Err(BufferError::Closed) => {
                    tracing::info!(
                        path = %stream.path().display(),
                        fed = fed,
                        "Broadcast stopped while feeding file"
                    );
                    return Ok(fed);
                }
                Err(e) => return Err(e.into()),
            }

            if self.config.realtime {
                let played = Duration::from_secs_f64(fed as f64 / byte_rate as f64);
                if let Some(ahead) = played.checked_sub(self.config.startup_burst) {
                    tokio::time::sleep_until(started + ahead).await;
                }
            }
        }

        tracing::debug!(
            path = %stream.path().display(),
            fed = fed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "File fed to broadcast"
        );

        Ok(fed)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::broadcast::BufferConfig;
    use crate::media::AudioFormat;
    use crate::shared_file::SharedFileRegistry;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("radiocast-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_feed_file_into_buffer() {
        let contents: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = temp_file("feed", &contents);
        let registry = Arc::new(SharedFileRegistry::new());
        let buffer = Arc::new(BroadcastBuffer::new(
            AudioFormat::default(),
            BufferConfig::default().capacity(16 * 1024),
        ));
        let mut cursor = buffer.open_cursor("test").unwrap();

        let feeder = FileFeeder::new(Arc::clone(&buffer), FeederConfig::default().unpaced());
        let mut stream = registry.open(&path).await.unwrap();
        let fed = feeder.feed(&mut stream, Some("Track 1")).await.unwrap();

        assert_eq!(fed, 10_000);
        let chunk = cursor.read(16 * 1024).await.unwrap();
        assert_eq!(&chunk.data[..], &contents[..]);
        assert_eq!(chunk.title.as_deref(), Some("Track 1"));

        drop(stream);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_feed_stops_with_broadcast() {
        let path = temp_file("feed-stopped", &[0u8; 1000]);
        let registry = Arc::new(SharedFileRegistry::new());
        let buffer = Arc::new(BroadcastBuffer::new(AudioFormat::default(), BufferConfig::default()));
        buffer.stop();

        let feeder = FileFeeder::new(Arc::clone(&buffer), FeederConfig::default().unpaced());
        let mut stream = registry.open(&path).await.unwrap();
        assert_eq!(feeder.feed(&mut stream, None).await.unwrap(), 0);

        drop(stream);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_pacing_after_burst() {
        // 32000 bytes at 128kbps is two seconds of audio
        let path = temp_file("feed-paced", &[0u8; 32_000]);
        let registry = Arc::new(SharedFileRegistry::new());
        let buffer = Arc::new(BroadcastBuffer::new(
            AudioFormat::default(),
            BufferConfig::default().capacity(64 * 1024),
        ));

        let config = FeederConfig::default()
            .chunk_size(4000)
            .startup_burst(Duration::from_secs(1));
        let feeder = FileFeeder::new(Arc::clone(&buffer), config);
        let mut stream = registry.open(&path).await.unwrap();

        let started = Instant::now();
        feeder.feed(&mut stream, None).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(buffer.write_offset(), 32_000);

        drop(stream);
        std::fs::remove_file(&path).unwrap();
    }
}
