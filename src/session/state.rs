//! Session state machine
//!
//! ```text
//! Init ──run()──► Streaming ──disconnect / error / broadcast end──► Closed
//!   │                                                                 ▲
//!   └──────────────────────────close()────────────────────────────────┘
//! ```

/// Listener session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Capabilities negotiated and cursor acquired, nothing sent yet
    Init,
    /// Forwarding broadcast bytes to the client
    Streaming,
    /// Cursor released, statistics final
    Closed,
}

impl SessionPhase {
    /// Check if the session still holds its cursor
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionPhase::Closed)
    }
}
