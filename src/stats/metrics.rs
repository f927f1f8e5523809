//! Statistics for listener sessions and broadcast buffers

use std::time::Duration;

/// Per-listener statistics, finalized when the session closes
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    /// Audio payload bytes delivered
    pub payload_bytes: u64,
    /// Total bytes written to the client (payload + metadata)
    pub bytes_sent: u64,
    /// Metadata blocks sent (including empty ones)
    pub metadata_blocks: u64,
    /// Metadata blocks that carried a title
    pub titles_sent: u64,
    /// Number of times the listener fell behind the ring
    pub underruns: u64,
    /// Payload bytes lost to underruns
    pub bytes_lost: u64,
    /// Leading bytes dropped to align on a frame header
    pub alignment_dropped: u64,
    /// Session duration
    pub duration: Duration,
}

impl ListenerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average delivered payload bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration.as_secs();
        if secs > 0 {
            (self.payload_bytes * 8) / secs
        } else {
            0
        }
    }

    /// Record an underrun that skipped `lost` bytes
    pub fn record_underrun(&mut self, lost: u64) {
        self.underruns += 1;
        self.bytes_lost += lost;
    }
}

/// Snapshot of a broadcast buffer
#[derive(Debug, Clone)]
pub struct BufferStats {
    /// Ring capacity in bytes
    pub capacity: usize,
    /// Total bytes written so far
    pub write_offset: u64,
    /// Bytes currently readable by a cursor at the oldest retained offset
    pub retained_bytes: usize,
    /// Open cursors
    pub listener_count: usize,
    /// Current title
    pub title: String,
    /// Time since the last write
    pub idle: Duration,
    /// Whether the broadcast has been stopped
    pub stopped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_stats_new() {
        let stats = ListenerStats::new();
        assert_eq!(stats.payload_bytes, 0);
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.metadata_blocks, 0);
        assert_eq!(stats.underruns, 0);
        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_listener_stats_bitrate() {
        let stats = ListenerStats {
            payload_bytes: 160_000,
            duration: Duration::from_secs(10),
            ..Default::default()
        };

        // 160,000 bytes * 8 bits / 10 seconds = 128,000 bps
        assert_eq!(stats.bitrate(), 128_000);
    }

    #[test]
    fn test_record_underrun() {
        let mut stats = ListenerStats::new();
        stats.record_underrun(1024);
        stats.record_underrun(512);

        assert_eq!(stats.underruns, 2);
        assert_eq!(stats.bytes_lost, 1536);
    }
}
