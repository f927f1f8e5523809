//! Shared file handles
//!
//! Many consumers may read the same file at once (several listeners of an
//! on-demand stream, or static pre-encoded segments). Instead of one
//! descriptor per consumer, the registry keeps one descriptor per canonical
//! path and hands out streams with private offsets.
//!
//! # Architecture
//!
//! ```text
//!                Arc<SharedFileRegistry>
//!            ┌──────────────────────────────┐
//!            │ files: Mutex<HashMap<Path,   │
//!            │   Arc<SharedFile {           │
//!            │     descriptor: Mutex<File>, │
//!            │     ref_count,               │
//!            │   }>                         │
//!            │ >>                           │
//!            └──────────────┬───────────────┘
//!                           │
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!   [SharedFileStream] [SharedFileStream] [SharedFileStream]
//!      position 0        position 4096     position 100
//! ```
//!
//! Each read locks the descriptor, seeks to the stream's own position and
//! reads, so interleaved reads never disturb each other.

pub mod error;
pub mod file;
pub mod registry;
pub mod stream;

pub use error::FileAccessError;
pub use file::SharedFile;
pub use registry::SharedFileRegistry;
pub use stream::SharedFileStream;
