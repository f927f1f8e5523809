//! Registry error types

use super::key::StreamKey;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Broadcast not found
    StreamNotFound(StreamKey),
    /// A live broadcast already exists for this key
    AlreadyBroadcasting(StreamKey),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(key) => write!(f, "Stream not found: {}", key),
            RegistryError::AlreadyBroadcasting(key) => {
                write!(f, "Stream already broadcasting: {}", key)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
