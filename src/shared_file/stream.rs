//! Logical reader over a shared file

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use super::error::FileAccessError;
use super::file::SharedFile;
use super::registry::SharedFileRegistry;

/// A reader with its own offset into a [`SharedFile`]
///
/// Offsets of streams on the same file are independent. Closing (or
/// dropping) the stream releases its reference exactly once.
pub struct SharedFileStream {
    registry: Arc<SharedFileRegistry>,
    file: Arc<SharedFile>,
    position: u64,
    closed: bool,
}

impl SharedFileStream {
    pub(super) fn new(registry: Arc<SharedFileRegistry>, file: Arc<SharedFile>) -> Self {
        Self {
            registry,
            file,
            position: 0,
            closed: false,
        }
    }

    /// Read into `buf` at this stream's offset
    ///
    /// Returns the number of bytes read; 0 means end of file.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FileAccessError> {
        if self.closed {
            return Err(FileAccessError::Closed);
        }

        let n = self.file.read_at(self.position, buf).await?;
        self.position += n as u64;
        Ok(n)
    }

    /// Read up to `max_len` bytes into a new buffer
    pub async fn read_chunk(&mut self, max_len: usize) -> Result<Bytes, FileAccessError> {
        let mut buf = vec![0; max_len];
        let n = self.read(&mut buf).await?;
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }

    /// Move this stream's offset; other streams are unaffected
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Offset of the next byte to read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Length of the underlying file
    pub async fn len(&self) -> Result<u64, FileAccessError> {
        if self.closed {
            return Err(FileAccessError::Closed);
        }
        self.file.len().await
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The shared descriptor backing this stream
    pub fn shared_file(&self) -> &Arc<SharedFile> {
        &self.file
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release this stream's reference
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.registry.release(&self.file);
    }
}

impl Drop for SharedFileStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SharedFileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFileStream")
            .field("path", &self.file.path())
            .field("position", &self.position)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("radiocast-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn read_exact(stream: &mut SharedFileStream, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let chunk = stream.read_chunk(len - out.len()).await.unwrap();
            assert!(!chunk.is_empty(), "unexpected end of file");
            out.extend_from_slice(&chunk);
        }
        out
    }

    #[tokio::test]
    async fn test_independent_offsets() {
        let contents: Vec<u8> = (0..=255u8).collect();
        let path = temp_file("offsets", &contents);
        let registry = Arc::new(SharedFileRegistry::new());

        let mut a = registry.open(&path).await.unwrap();
        let mut b = registry.open(&path).await.unwrap();

        assert_eq!(read_exact(&mut a, 100).await, &contents[..100]);
        assert_eq!(read_exact(&mut b, 50).await, &contents[..50]);
        assert_eq!(read_exact(&mut a, 10).await, &contents[100..110]);

        assert_eq!(a.position(), 110);
        assert_eq!(b.position(), 50);

        drop(a);
        drop(b);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_eof_seek_and_len() {
        let path = temp_file("eof", b"0123456789");
        let registry = Arc::new(SharedFileRegistry::new());
        let mut stream = registry.open(&path).await.unwrap();

        assert_eq!(stream.len().await.unwrap(), 10);

        stream.seek(8);
        assert_eq!(&read_exact(&mut stream, 2).await[..], b"89");
        assert!(stream.read_chunk(16).await.unwrap().is_empty());

        stream.seek(0);
        assert_eq!(&read_exact(&mut stream, 3).await[..], b"012");

        drop(stream);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let path = temp_file("idempotent", b"data");
        let registry = Arc::new(SharedFileRegistry::new());

        let mut first = registry.open(&path).await.unwrap();
        let second = registry.open(&path).await.unwrap();
        assert_eq!(registry.ref_count(&path), 2);

        first.close();
        first.close();
        drop(first);
        assert_eq!(registry.ref_count(&path), 1);

        drop(second);
        assert_eq!(registry.ref_count(&path), 0);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_read_after_close() {
        let path = temp_file("closed", b"data");
        let registry = Arc::new(SharedFileRegistry::new());
        let mut stream = registry.open(&path).await.unwrap();

        stream.close();
        assert!(stream.is_closed());
        assert!(matches!(
            stream.read_chunk(4).await,
            Err(FileAccessError::Closed)
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
