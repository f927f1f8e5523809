//! Client sinks
//!
//! A sink is wherever a listener's bytes go: a socket, an HTTP response
//! body, a channel feeding one. The session only needs ordered writes and a
//! way to signal that it is done.

use std::future::Future;
use std::io;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Destination for a listener's bytes
pub trait ClientSink: Send {
    /// Write all of `data`, in order
    ///
    /// An error of kind [`io::ErrorKind::WouldBlock`] means the client cannot
    /// keep up; any other error means it is gone.
    fn write(&mut self, data: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Signal end of stream; called once when the session closes
    fn close(&mut self) {}
}

/// Sink over any async writer (TCP stream, response body pipe)
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AsyncWrite + Unpin + Send> ClientSink for WriterSink<W> {
    async fn write(&mut self, data: Bytes) -> io::Result<()> {
        self.writer.write_all(&data).await?;
        self.writer.flush().await
    }
}

/// Sink feeding a bounded channel
///
/// Never waits: a full channel is reported as backpressure so one stuck
/// consumer cannot hold up its session.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    /// Create a sink and the receiver that consumes it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }
}

impl ClientSink for ChannelSink {
    async fn write(&mut self, data: Bytes) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))?;

        tx.try_send(data).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                io::Error::new(io::ErrorKind::WouldBlock, "client channel full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                io::Error::new(io::ErrorKind::BrokenPipe, "client went away")
            }
        })
    }

    fn close(&mut self) {
        self.tx = None;
    }
}
