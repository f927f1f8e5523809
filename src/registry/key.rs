//! Broadcast identity

use crate::media::AudioFormat;

/// Unique identifier for a broadcast (channel + output format)
///
/// A channel encoded in two formats is two independent broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    /// Channel ID
    pub channel_id: u64,
    /// Encoder output format
    pub format: AudioFormat,
}

impl StreamKey {
    /// Create a new stream key
    pub fn new(channel_id: u64, format: AudioFormat) -> Self {
        Self { channel_id, format }
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.format)
    }
}
