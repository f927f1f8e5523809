//! Listener sessions
//!
//! A session ties one connected listener to a broadcast: it negotiates
//! metadata support, reads from its own cursor, aligns the first chunk on a
//! frame boundary, interleaves ICY metadata and writes to the client sink.

pub mod config;
pub mod context;
pub mod error;
pub mod listen;
pub mod sink;
pub mod state;

pub use config::SessionConfig;
pub use context::ListenerContext;
pub use error::SessionError;
pub use listen::ListenSession;
pub use sink::{ChannelSink, ClientSink, WriterSink};
pub use state::SessionPhase;
