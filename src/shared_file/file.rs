//! A single physical descriptor shared by many logical readers

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use super::error::FileAccessError;

/// An open file shared by every [`SharedFileStream`](super::SharedFileStream)
/// for the same canonical path
///
/// The descriptor has one physical position, so every read takes the
/// descriptor lock, seeks to the caller's logical offset and reads. The
/// reference count is only changed under the registry lock.
pub struct SharedFile {
    path: PathBuf,
    descriptor: Mutex<Option<File>>,
    pub(super) ref_count: AtomicUsize,
    opened_at: Instant,
}

impl SharedFile {
    pub(super) fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            descriptor: Mutex::new(Some(file)),
            ref_count: AtomicUsize::new(1),
            opened_at: Instant::now(),
        }
    }

    /// Canonical path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of open streams on this file
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// How long the descriptor has been open
    pub fn open_duration(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }

    /// Read into `buf` starting at `offset`
    pub(super) async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, FileAccessError> {
        let mut descriptor = self.descriptor.lock().await;
        let file = descriptor.as_mut().ok_or(FileAccessError::Closed)?;

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| self.read_error(source))?;
        file.read(buf).await.map_err(|source| self.read_error(source))
    }

    /// Current file length
    pub(super) async fn len(&self) -> Result<u64, FileAccessError> {
        let descriptor = self.descriptor.lock().await;
        let file = descriptor.as_ref().ok_or(FileAccessError::Closed)?;

        let metadata = file.metadata().await.map_err(|source| self.read_error(source))?;
        Ok(metadata.len())
    }

    /// Close the descriptor
    ///
    /// Called with the registry lock held once the count reaches zero, when
    /// no stream can be holding the descriptor lock.
    pub(super) fn close_descriptor(&self) -> bool {
        match self.descriptor.try_lock() {
            Ok(mut descriptor) => descriptor.take().is_some(),
            Err(_) => false,
        }
    }

    fn read_error(&self, source: std::io::Error) -> FileAccessError {
        FileAccessError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for SharedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFile")
            .field("path", &self.path)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
