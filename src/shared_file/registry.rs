//! Registry of open shared files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::FileAccessError;
use super::file::SharedFile;
use super::stream::SharedFileStream;

/// Deduplicates opens of the same file
///
/// At most one [`SharedFile`] exists per canonical path. The map lookup,
/// insertion and the final close all run under the registry lock, so a
/// concurrent `open` sees either the live entry or no entry, never one being
/// torn down. Path resolution and `open(2)` happen outside the lock on the
/// blocking pool; reads go through each file's own lock.
#[derive(Default)]
pub struct SharedFileRegistry {
    files: Mutex<HashMap<PathBuf, Arc<SharedFile>>>,
}

impl SharedFileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a logical stream on `path`
    ///
    /// Reuses the open descriptor if another stream has the same file open.
    pub async fn open(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
    ) -> Result<SharedFileStream, FileAccessError> {
        let path = path.as_ref();
        let canonical =
            tokio::fs::canonicalize(path)
                .await
                .map_err(|source| FileAccessError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;

        if let Some(file) = self.acquire(&canonical) {
            return Ok(SharedFileStream::new(Arc::clone(self), file));
        }

        let descriptor =
            tokio::fs::File::open(&canonical)
                .await
                .map_err(|source| FileAccessError::Open {
                    path: canonical.clone(),
                    source,
                })?;

        let file = {
            let mut files = self.lock_files();

            match files.get(&canonical) {
                // Another task opened it while we were in open(2); ours is dropped
                Some(file) => {
                    file.ref_count.fetch_add(1, Ordering::AcqRel);
                    Arc::clone(file)
                }
                None => {
                    let file = Arc::new(SharedFile::new(canonical.clone(), descriptor));
                    files.insert(canonical.clone(), Arc::clone(&file));

                    tracing::info!(
                        path = %canonical.display(),
                        open_files = files.len(),
                        "Shared file opened"
                    );
                    file
                }
            }
        };

        Ok(SharedFileStream::new(Arc::clone(self), file))
    }

    /// Take a reference on an already open file
    fn acquire(&self, canonical: &Path) -> Option<Arc<SharedFile>> {
        let files = self.lock_files();
        let file = files.get(canonical)?;

        let count = file.ref_count.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            path = %canonical.display(),
            ref_count = count,
            "Shared file reused"
        );
        Some(Arc::clone(file))
    }

    /// Drop one reference; the last one closes the descriptor
    pub(super) fn release(&self, file: &Arc<SharedFile>) {
        let mut files = self.lock_files();

        let remaining = file.ref_count.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining > 0 {
            tracing::debug!(
                path = %file.path().display(),
                ref_count = remaining,
                "Shared file released"
            );
            return;
        }

        if files
            .get(file.path())
            .is_some_and(|entry| Arc::ptr_eq(entry, file))
        {
            files.remove(file.path());
        }
        let closed = file.close_descriptor();

        tracing::info!(
            path = %file.path().display(),
            closed = closed,
            open_files = files.len(),
            "Shared file closed"
        );
    }

    /// Number of open streams on `path` (0 if not open)
    pub fn ref_count(&self, path: impl AsRef<Path>) -> usize {
        let Ok(canonical) = std::fs::canonicalize(path) else {
            return 0;
        };

        self.lock_files()
            .get(&canonical)
            .map(|file| file.ref_count())
            .unwrap_or(0)
    }

    /// Whether `path` currently has an open descriptor
    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        self.ref_count(path) > 0
    }

    /// Number of distinct open files
    pub fn len(&self) -> usize {
        self.lock_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_files(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<SharedFile>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
