//! Frame-sync alignment for listeners joining mid-frame
//!
//! A cursor opens at the current write offset, which is almost never a frame
//! boundary. Some players refuse to start on leading garbage, so the first
//! chunk a listener receives is trimmed to the first frame sync marker.

use bytes::Bytes;

/// Find the first occurrence of a two-byte sync marker
pub fn find_frame_sync(data: &[u8], marker: [u8; 2]) -> Option<usize> {
    data.windows(2).position(|pair| pair == marker)
}

/// One-shot aligner applied to the first non-empty chunk of a session
#[derive(Debug)]
pub struct FrameAligner {
    marker: Option<[u8; 2]>,
    done: bool,
}

impl FrameAligner {
    /// Create an aligner; `None` disables alignment (non frame-based codecs)
    pub fn new(marker: Option<[u8; 2]>) -> Self {
        Self {
            marker,
            done: marker.is_none(),
        }
    }

    /// Whether the first chunk has already been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Align a chunk, returning it and the number of leading bytes dropped
    ///
    /// Empty chunks do not consume the one-shot. If no marker is found the
    /// chunk is forwarded as-is.
    pub fn align(&mut self, chunk: Bytes) -> (Bytes, usize) {
        if self.done || chunk.is_empty() {
            return (chunk, 0);
        }
        self.done = true;

        let Some(marker) = self.marker else {
            return (chunk, 0);
        };

        match find_frame_sync(&chunk, marker) {
            Some(0) => (chunk, 0),
            Some(index) => {
                tracing::debug!(skipped = index, "Skipping bytes before frame header");
                (chunk.slice(index..), index)
            }
            None => {
                tracing::debug!(len = chunk.len(), "No frame header in first chunk");
                (chunk, 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MP3_SYNC: [u8; 2] = [0xFF, 0xFB];

    #[test]
    fn test_find_frame_sync() {
        assert_eq!(find_frame_sync(&[0xFF, 0xFB, 0x90], MP3_SYNC), Some(0));
        assert_eq!(find_frame_sync(&[0x00, 0xFF, 0xFF, 0xFB], MP3_SYNC), Some(2));
        assert_eq!(find_frame_sync(&[0x00, 0xFF], MP3_SYNC), None);
        assert_eq!(find_frame_sync(&[], MP3_SYNC), None);
    }

    #[test]
    fn test_align_drops_leading_bytes() {
        let mut aligner = FrameAligner::new(Some(MP3_SYNC));
        let chunk = Bytes::from_static(&[0x00, 0x00, 0xFF, 0xFB, 0x10, 0x44]);

        let (aligned, dropped) = aligner.align(chunk);
        assert_eq!(&aligned[..], &[0xFF, 0xFB, 0x10, 0x44]);
        assert_eq!(dropped, 2);
        assert!(aligner.is_done());
    }

    #[test]
    fn test_align_only_first_chunk() {
        let mut aligner = FrameAligner::new(Some(MP3_SYNC));

        // Empty chunks don't count as the first chunk
        let (empty, _) = aligner.align(Bytes::new());
        assert!(empty.is_empty());
        assert!(!aligner.is_done());

        aligner.align(Bytes::from_static(&[0xFF, 0xFB]));

        let second = Bytes::from_static(&[0x00, 0xFF, 0xFB]);
        let (out, dropped) = aligner.align(second.clone());
        assert_eq!(out, second);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_align_without_marker_is_passthrough() {
        let mut aligner = FrameAligner::new(Some(MP3_SYNC));
        let chunk = Bytes::from_static(&[0x01, 0x02, 0x03]);

        let (out, dropped) = aligner.align(chunk.clone());
        assert_eq!(out, chunk);
        assert_eq!(dropped, 0);
        assert!(aligner.is_done());
    }

    #[test]
    fn test_disabled_aligner() {
        let mut aligner = FrameAligner::new(None);
        assert!(aligner.is_done());

        let chunk = Bytes::from_static(&[0x00, 0xFF, 0xFB]);
        let (out, _) = aligner.align(chunk.clone());
        assert_eq!(out, chunk);
    }
}
