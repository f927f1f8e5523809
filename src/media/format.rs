//! Audio output formats
//!
//! The broadcast core treats audio as opaque bytes. The only codec knowledge
//! it needs is the HTTP content type and, for frame-based codecs, the
//! two-byte sync marker used to align a listener's first chunk.

use std::fmt;
use std::str::FromStr;

/// Codec produced by the upstream encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// MPEG-1 Layer III
    Mp3,
    /// AAC in ADTS framing
    Aac,
    /// Opus in an Ogg container
    Opus,
}

impl Codec {
    /// MIME type sent to listeners
    pub fn content_type(&self) -> &'static str {
        match self {
            Codec::Mp3 => "audio/mpeg",
            Codec::Aac => "audio/aac",
            Codec::Opus => "audio/ogg",
        }
    }

    /// Frame sync marker, if the codec is frame based
    ///
    /// Ogg pages are not aligned by this crate, so Opus has no marker.
    pub fn frame_sync(&self) -> Option<[u8; 2]> {
        match self {
            Codec::Mp3 => Some([0xFF, 0xFB]),
            Codec::Aac => Some([0xFF, 0xF1]),
            Codec::Opus => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
            Codec::Opus => "opus",
        }
    }
}

/// Codec plus target bitrate, e.g. `mp3_128k`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub codec: Codec,
    /// Bitrate in kilobits per second
    pub bitrate_kbps: u32,
}

impl AudioFormat {
    pub const fn new(codec: Codec, bitrate_kbps: u32) -> Self {
        Self {
            codec,
            bitrate_kbps,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.codec.content_type()
    }

    pub fn frame_sync(&self) -> Option<[u8; 2]> {
        self.codec.frame_sync()
    }

    /// Bytes per second at the nominal bitrate
    pub fn byte_rate(&self) -> u64 {
        u64::from(self.bitrate_kbps) * 1000 / 8
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(Codec::Mp3, 128)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}k", self.codec.name(), self.bitrate_kbps)
    }
}

/// Error returned when a format name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown audio format: {}", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for AudioFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownFormat(s.to_string());

        let (codec, bitrate) = s.split_once('_').ok_or_else(unknown)?;
        let codec = match codec.to_ascii_lowercase().as_str() {
            "mp3" => Codec::Mp3,
            "aac" => Codec::Aac,
            "opus" => Codec::Opus,
            _ => return Err(unknown()),
        };
        let bitrate_kbps = bitrate
            .strip_suffix(['k', 'K'])
            .unwrap_or(bitrate)
            .parse::<u32>()
            .map_err(|_| unknown())?;

        if bitrate_kbps == 0 {
            return Err(unknown());
        }

        Ok(Self::new(codec, bitrate_kbps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        let format: AudioFormat = "mp3_128k".parse().unwrap();
        assert_eq!(format, AudioFormat::new(Codec::Mp3, 128));

        let format: AudioFormat = "AAC_64".parse().unwrap();
        assert_eq!(format, AudioFormat::new(Codec::Aac, 64));

        assert!("flac_900k".parse::<AudioFormat>().is_err());
        assert!("mp3".parse::<AudioFormat>().is_err());
        assert!("mp3_0k".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn test_display_round_trips_name() {
        let format = AudioFormat::new(Codec::Opus, 48);
        assert_eq!(format.to_string(), "opus_48k");
    }

    #[test]
    fn test_codec_properties() {
        assert_eq!(AudioFormat::default().content_type(), "audio/mpeg");
        assert_eq!(Codec::Mp3.frame_sync(), Some([0xFF, 0xFB]));
        assert_eq!(Codec::Opus.frame_sync(), None);
        assert_eq!(AudioFormat::new(Codec::Mp3, 128).byte_rate(), 16_000);
    }
}
