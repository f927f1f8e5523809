//! Crate-wide error type
//!
//! Each subsystem has its own error enum; this wraps them for callers that
//! drive several at once (feeders, servers).

use std::fmt;
use std::io;

use crate::broadcast::BufferError;
use crate::media::UnknownFormat;
use crate::registry::RegistryError;
use crate::session::SessionError;
use crate::shared_file::FileAccessError;

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug)]
pub enum Error {
    /// Broadcast buffer error
    Buffer(BufferError),
    /// Listener session error
    Session(SessionError),
    /// Shared file error
    File(FileAccessError),
    /// Registry error
    Registry(RegistryError),
    /// Unparseable format name
    Format(UnknownFormat),
    /// I/O error
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Buffer(e) => write!(f, "Buffer error: {}", e),
            Error::Session(e) => write!(f, "Session error: {}", e),
            Error::File(e) => write!(f, "File error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Format(e) => write!(f, "Format error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Buffer(e) => Some(e),
            Error::Session(e) => Some(e),
            Error::File(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Format(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<BufferError> for Error {
    fn from(e: BufferError) -> Self {
        Error::Buffer(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

impl From<FileAccessError> for Error {
    fn from(e: FileAccessError) -> Self {
        Error::File(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

impl From<UnknownFormat> for Error {
    fn from(e: UnknownFormat) -> Self {
        Error::Format(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
