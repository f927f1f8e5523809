//! Listener session error types

use std::io;
use std::time::Duration;

/// Reasons a listener session ends abnormally
#[derive(Debug)]
pub enum SessionError {
    /// The broadcast was already stopped when the session tried to join
    BroadcastEnded,
    /// No encoder output within the stall timeout
    EncoderStall { idle: Duration },
    /// The client could not keep up with the broadcast
    SlowClientBackpressure,
    /// Writing to the client failed
    ClientDisconnected(io::Error),
    /// The session was already closed
    Closed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::BroadcastEnded => write!(f, "Broadcast has ended"),
            SessionError::EncoderStall { idle } => {
                write!(f, "Encoder stalled: no data for {:?}", idle)
            }
            SessionError::SlowClientBackpressure => write!(f, "Client too slow, dropped"),
            SessionError::ClientDisconnected(e) => write!(f, "Client disconnected: {}", e),
            SessionError::Closed => write!(f, "Session closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::ClientDisconnected(e) => Some(e),
            _ => None,
        }
    }
}
