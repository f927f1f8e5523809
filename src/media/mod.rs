//! Media handling for the broadcast core
//!
//! This module provides:
//! - Audio output formats (content type, frame sync marker, bitrate)
//! - First-chunk frame-sync alignment
//! - ICY metadata block encoding and interleaving

pub mod format;
pub mod icy;
pub mod sync;

pub use format::{AudioFormat, Codec, UnknownFormat};
pub use icy::{encode_block, IcyInterleaver, DEFAULT_META_INTERVAL};
pub use sync::{find_frame_sync, FrameAligner};
