//! Shared file error types

use std::io;
use std::path::PathBuf;

/// Error type for shared file access
#[derive(Debug)]
pub enum FileAccessError {
    /// The file could not be resolved or opened
    Open { path: PathBuf, source: io::Error },
    /// Positioning or reading the descriptor failed
    Read { path: PathBuf, source: io::Error },
    /// The stream was already closed
    Closed,
}

impl FileAccessError {
    /// Path of the file involved, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            FileAccessError::Open { path, .. } | FileAccessError::Read { path, .. } => Some(path),
            FileAccessError::Closed => None,
        }
    }
}

impl std::fmt::Display for FileAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileAccessError::Open { path, source } => {
                write!(f, "Failed to open {}: {}", path.display(), source)
            }
            FileAccessError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            FileAccessError::Closed => write!(f, "Shared file stream closed"),
        }
    }
}

impl std::error::Error for FileAccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileAccessError::Open { source, .. } | FileAccessError::Read { source, .. } => {
                Some(source)
            }
            FileAccessError::Closed => None,
        }
    }
}
