//! ICY (SHOUTcast) in-band metadata
//!
//! Clients that send `Icy-MetaData: 1` receive a metadata block after every
//! `icy-metaint` bytes of audio payload.
//!
//! # Block Format
//!
//! ```text
//! +--------+------------------------------------------+
//! | L (u8) | L * 16 bytes: StreamTitle='...'; + NULs  |
//! +--------+------------------------------------------+
//! ```
//!
//! A block with `L = 0` is a single zero byte and means "no change".

use bytes::{BufMut, Bytes, BytesMut};

/// Default number of payload bytes between metadata blocks
pub const DEFAULT_META_INTERVAL: usize = 8192;

/// Metadata blocks are sized in units of this many bytes
pub const META_BLOCK_UNIT: usize = 16;

/// Largest payload a block can carry (length byte is a u8)
pub const MAX_META_PAYLOAD: usize = u8::MAX as usize * META_BLOCK_UNIT;

const TITLE_PREFIX: &str = "StreamTitle='";
const TITLE_SUFFIX: &str = "';";

/// Encode a metadata block
///
/// `None` encodes the single-byte "no change" block.
pub fn encode_block(title: Option<&str>) -> Bytes {
    let Some(title) = title else {
        return Bytes::from_static(&[0]);
    };

    let max_title = MAX_META_PAYLOAD - TITLE_PREFIX.len() - TITLE_SUFFIX.len();
    let title = truncate_utf8(title, max_title);

    let text_len = TITLE_PREFIX.len() + title.len() + TITLE_SUFFIX.len();
    let units = text_len.div_ceil(META_BLOCK_UNIT);

    let mut block = BytesMut::with_capacity(1 + units * META_BLOCK_UNIT);
    block.put_u8(units as u8);
    block.put_slice(TITLE_PREFIX.as_bytes());
    block.put_slice(title.as_bytes());
    block.put_slice(TITLE_SUFFIX.as_bytes());
    block.put_bytes(0, units * META_BLOCK_UNIT - text_len);

    block.freeze()
}

fn truncate_utf8(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Interleaves metadata blocks into an outgoing payload stream
///
/// Tracks the byte position within the current metadata interval across
/// chunks. A block is emitted immediately before the first payload byte that
/// follows an interval boundary, so a chunk ending exactly on a boundary
/// defers its block to the start of the next chunk.
#[derive(Debug)]
pub struct IcyInterleaver {
    interval: usize,
    until_block: usize,
    current_title: String,
    last_sent: String,
    blocks_sent: u64,
    titles_sent: u64,
}

impl IcyInterleaver {
    /// Create an interleaver; an interval of zero is treated as one byte
    pub fn new(interval: usize) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            until_block: interval,
            current_title: String::new(),
            last_sent: String::new(),
            blocks_sent: 0,
            titles_sent: 0,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    /// Record the broadcast's current title
    ///
    /// An empty title counts as unset and is never announced.
    pub fn observe_title(&mut self, title: &str) {
        if self.current_title != title {
            self.current_title.clear();
            self.current_title.push_str(title);
        }
    }

    /// Whether the next block will carry a title
    pub fn has_pending_title(&self) -> bool {
        self.current_title != self.last_sent
    }

    pub fn blocks_sent(&self) -> u64 {
        self.blocks_sent
    }

    pub fn titles_sent(&self) -> u64 {
        self.titles_sent
    }

    /// Interleave metadata into a payload chunk
    pub fn interleave(&mut self, payload: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(payload.len() + payload.len() / self.interval + 1);
        let mut rest = payload;

        while !rest.is_empty() {
            if self.until_block == 0 {
                let block = self.next_block();
                out.put_slice(&block);
                self.until_block = self.interval;
            }

            let take = self.until_block.min(rest.len());
            out.put_slice(&rest[..take]);
            rest = &rest[take..];
            self.until_block -= take;
        }

        out.freeze()
    }

    fn next_block(&mut self) -> Bytes {
        self.blocks_sent += 1;

        if !self.has_pending_title() {
            return encode_block(None);
        }

        self.last_sent.clone_from(&self.current_title);
        self.titles_sent += 1;
        tracing::debug!(title = %self.last_sent, "Sending stream title");
        encode_block(Some(&self.last_sent))
    }
}
