//! Broadcast registry
//!
//! The registry owns the live broadcast buffers and hands them to encoders
//! and listener sessions.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<BroadcastRegistry>
//!                 ┌─────────────────────────────┐
//!                 │ streams: HashMap<StreamKey, │
//!                 │   BroadcastEntry {          │
//!                 │     buffer: Arc<Buffer>,    │
//!                 │   }                         │
//!                 │ >                           │
//!                 └──────────────┬──────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!    [Encoder]             [ListenSession]         [ListenSession]
//!    buffer.write()        cursor.read()           cursor.read()
//! ```
//!
//! Buffers are shared as `Arc`; the registry only decides which buffer a
//! key maps to and when a broadcast is torn down.

pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{BroadcastEntry, BroadcastState};
pub use error::RegistryError;
pub use key::StreamKey;
pub use store::BroadcastRegistry;
