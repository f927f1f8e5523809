//! Listener session configuration

use std::time::Duration;

use crate::media::icy::DEFAULT_META_INTERVAL;

/// Configuration for a [`ListenSession`](super::ListenSession)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Payload bytes between ICY metadata blocks
    pub metadata_interval: usize,

    /// Maximum bytes pulled from the buffer per read
    pub read_chunk_size: usize,

    /// A sink write taking longer than this drops the listener
    pub sink_write_timeout: Duration,

    /// End the session when the encoder stalls (otherwise keep waiting)
    pub terminate_on_stall: bool,

    /// Honor listener requests for in-band metadata
    pub metadata_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            metadata_interval: DEFAULT_META_INTERVAL,
            read_chunk_size: 4096,
            sink_write_timeout: Duration::from_secs(5),
            terminate_on_stall: true,
            metadata_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Set the metadata interval (minimum 1 byte)
    pub fn metadata_interval(mut self, interval: usize) -> Self {
        self.metadata_interval = interval.max(1);
        self
    }

    /// Set the read chunk size (minimum 1 byte)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Set the sink write timeout
    pub fn sink_write_timeout(mut self, timeout: Duration) -> Self {
        self.sink_write_timeout = timeout;
        self
    }

    /// Keep listeners connected through encoder stalls
    pub fn survive_stalls(mut self) -> Self {
        self.terminate_on_stall = false;
        self
    }

    /// Never interleave metadata, even if requested
    pub fn disable_metadata(mut self) -> Self {
        self.metadata_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();

        assert_eq!(config.metadata_interval, 8192);
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.sink_write_timeout, Duration::from_secs(5));
        assert!(config.terminate_on_stall);
        assert!(config.metadata_enabled);
    }

    #[test]
    fn test_builder_chaining() {
        let config = SessionConfig::default()
            .metadata_interval(0)
            .read_chunk_size(1024)
            .sink_write_timeout(Duration::from_millis(250))
            .survive_stalls()
            .disable_metadata();

        assert_eq!(config.metadata_interval, 1);
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.sink_write_timeout, Duration::from_millis(250));
        assert!(!config.terminate_on_stall);
        assert!(!config.metadata_enabled);
    }
}
