//! Live audio broadcast core
//!
//! One encoder writes a channel's compressed audio into a fixed-size ring
//! buffer; any number of listeners read it back through independent cursors
//! and receive byte-identical streams, with optional in-band ICY metadata.
//!
//! # Architecture
//!
//! ```text
//!   Encoder / FileFeeder
//!          │ write()
//!          ▼
//!  ┌────────────────────────────────────────────┐
//!  │ BroadcastBuffer (ring, absolute offsets)   │
//!  │   W ──────────────────────────────▶        │
//!  │   [ W-C ........................ W )       │
//!  └──────┬──────────────┬──────────────┬───────┘
//!         │              │              │
//!   ListenerCursor ListenerCursor ListenerCursor
//!         │              │              │
//!   ListenSession  ListenSession  ListenSession
//!   align + ICY    align + ICY    align
//!         │              │              │
//!     ClientSink     ClientSink     ClientSink
//! ```
//!
//! Pre-recorded content is read through [`SharedFileRegistry`], which keeps
//! one open descriptor per file no matter how many streams read it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use radiocast::{
//!     AudioFormat, BroadcastRegistry, ChannelSink, ListenSession, ListenerContext,
//!     SessionConfig, StreamKey,
//! };
//!
//! #[tokio::main]
//! async fn main() -> radiocast::Result<()> {
//!     let registry = Arc::new(BroadcastRegistry::new());
//!     let key = StreamKey::new(1, AudioFormat::default());
//!     let buffer = registry.start_broadcast(key).await?;
//!
//!     let (sink, _rx) = ChannelSink::channel(64);
//!     let ctx = ListenerContext::new(1).with_icy_metadata(true);
//!     let mut session = ListenSession::open(&buffer, sink, ctx, SessionConfig::default())?;
//!
//!     buffer.write(&[0xFF, 0xFB, 0x90, 0x00])?;
//!     buffer.stop();
//!     session.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod error;
pub mod media;
pub mod registry;
pub mod session;
pub mod shared_file;
pub mod stats;

pub use broadcast::{BroadcastBuffer, BufferConfig, BufferError, FeederConfig, FileFeeder};
pub use error::{Error, Result};
pub use media::{AudioFormat, Codec};
pub use registry::{BroadcastRegistry, RegistryConfig, StreamKey};
pub use session::{
    ChannelSink, ClientSink, ListenSession, ListenerContext, SessionConfig, SessionError,
    WriterSink,
};
pub use shared_file::{FileAccessError, SharedFileRegistry, SharedFileStream};
pub use stats::{BufferStats, ListenerStats};
