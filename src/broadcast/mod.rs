//! Broadcast fan-out buffer
//!
//! One encoder writes, any number of listeners read. Each listener owns a
//! cursor into a fixed-size ring; the writer never waits on them.
//!
//! # Architecture
//!
//! ```text
//!   [Encoder] ──write()──► Arc<BroadcastBuffer> ◄──set_title()── [Encoder]
//!                          ┌───────────────────┐
//!                          │ ring: [u8; C]     │
//!                          │ write_offset: W   │
//!                          │ title             │
//!                          │ signal: watch<W>  │
//!                          └─────────┬─────────┘
//!             ┌──────────────────────┼──────────────────────┐
//!             ▼                      ▼                      ▼
//!      ListenerCursor         ListenerCursor         ListenerCursor
//!      cursor.read()          cursor.read()          cursor.read()
//! ```
//!
//! A reader that falls more than `C` bytes behind gets
//! [`BufferError::Underrun`] once and continues from the oldest retained byte.

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod feeder;

pub use buffer::{BroadcastBuffer, ReadChunk};
pub use config::BufferConfig;
pub use cursor::ListenerCursor;
pub use error::BufferError;
pub use feeder::{FeederConfig, FileFeeder};
