//! Listener session
//!
//! Binds one client sink to a broadcast cursor. Bytes pass through two
//! transformations on the way out:
//!
//! 1. The first non-empty chunk is trimmed to the first frame sync marker
//!    (frame-based codecs only).
//! 2. If the client asked for it, ICY metadata blocks are interleaved every
//!    `metadata_interval` payload bytes.
//!
//! The session never writes to the broadcast. Closing is idempotent and runs
//! on drop, so the cursor is released on every exit path, including
//! cancellation of [`ListenSession::run`].

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use super::config::SessionConfig;
use super::context::ListenerContext;
use super::error::SessionError;
use super::sink::ClientSink;
use super::state::SessionPhase;
use crate::broadcast::{BroadcastBuffer, BufferError, ListenerCursor, ReadChunk};
use crate::media::{AudioFormat, FrameAligner, IcyInterleaver};
use crate::stats::ListenerStats;

/// One listener's connection to a broadcast
pub struct ListenSession<S: ClientSink> {
    context: ListenerContext,
    config: SessionConfig,
    format: AudioFormat,
    station_name: String,
    phase: SessionPhase,
    cursor: Option<ListenerCursor>,
    sink: S,
    aligner: FrameAligner,
    icy: Option<IcyInterleaver>,
    stats: ListenerStats,
    started_at: Instant,
}

impl<S: ClientSink> ListenSession<S> {
    /// Negotiate capabilities and join the broadcast
    ///
    /// The session starts in [`SessionPhase::Init`]; send
    /// [`response_headers`](Self::response_headers) and then call
    /// [`run`](Self::run).
    pub fn open(
        buffer: &Arc<BroadcastBuffer>,
        sink: S,
        context: ListenerContext,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let cursor = buffer
            .open_cursor(context.label())
            .map_err(|_| SessionError::BroadcastEnded)?;

        let format = buffer.format();
        let icy = (context.icy_metadata && config.metadata_enabled)
            .then(|| IcyInterleaver::new(config.metadata_interval));

        tracing::info!(
            listener = context.listener_id,
            peer = ?context.peer_addr,
            user_agent = ?context.user_agent,
            format = %format,
            icy = icy.is_some(),
            "Listener joined"
        );

        Ok(Self {
            aligner: FrameAligner::new(format.frame_sync()),
            station_name: buffer.name().to_string(),
            format,
            icy,
            context,
            config,
            phase: SessionPhase::Init,
            cursor: Some(cursor),
            sink,
            stats: ListenerStats::new(),
            started_at: Instant::now(),
        })
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn context(&self) -> &ListenerContext {
        &self.context
    }

    /// Whether metadata interleaving was negotiated
    pub fn icy_enabled(&self) -> bool {
        self.icy.is_some()
    }

    /// Content type of the outgoing stream
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Headers the HTTP layer should send before the body
    pub fn response_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", self.content_type().to_string()),
            ("Accept-Ranges", "none".to_string()),
        ];

        if let Some(icy) = &self.icy {
            headers.push(("icy-metadata", "1".to_string()));
            headers.push(("icy-metaint", icy.interval().to_string()));
            headers.push((
                "icy-name",
                format!("{} @ {}K", self.station_name, self.format.bitrate_kbps),
            ));
        }

        headers
    }

    /// The client sink, for writing the response head before [`run`](Self::run)
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Statistics so far (final once closed)
    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    /// Stream until the broadcast ends or the listener fails
    ///
    /// Returns the final statistics when the broadcast stops. Underruns are
    /// logged and counted but do not end the session. The session is closed
    /// when this returns.
    pub async fn run(&mut self) -> Result<ListenerStats, SessionError> {
        if self.phase == SessionPhase::Closed {
            return Err(SessionError::Closed);
        }
        self.phase = SessionPhase::Streaming;

        let result = self.stream().await;

        if let Err(ref e) = result {
            tracing::info!(listener = self.context.listener_id, error = %e, "Listener dropped");
        }

        self.close();
        result.map(|()| self.stats.clone())
    }

    async fn stream(&mut self) -> Result<(), SessionError> {
        loop {
            let cursor = self.cursor.as_mut().ok_or(SessionError::Closed)?;
            let read = cursor.read(self.config.read_chunk_size).await;

            let chunk = match read {
                Ok(chunk) => chunk,
                Err(BufferError::Underrun { skipped }) => {
                    self.stats.record_underrun(skipped);
                    tracing::warn!(
                        listener = self.context.listener_id,
                        skipped = skipped,
                        underruns = self.stats.underruns,
                        "Listener fell behind broadcast, resynchronized"
                    );
                    continue;
                }
                Err(BufferError::EncoderStall { idle }) => {
                    if self.config.terminate_on_stall {
                        return Err(SessionError::EncoderStall { idle });
                    }
                    tracing::warn!(
                        listener = self.context.listener_id,
                        idle_ms = idle.as_millis() as u64,
                        "Encoder stalled, still waiting"
                    );
                    continue;
                }
                Err(BufferError::Closed) => {
                    tracing::debug!(listener = self.context.listener_id, "Broadcast ended");
                    return Ok(());
                }
            };

            self.forward(chunk).await?;
        }
    }

    async fn forward(&mut self, chunk: ReadChunk) -> Result<(), SessionError> {
        if let (Some(icy), Some(title)) = (self.icy.as_mut(), chunk.title.as_deref()) {
            icy.observe_title(title);
        }

        let (payload, dropped) = self.aligner.align(chunk.data);
        self.stats.alignment_dropped += dropped as u64;
        if payload.is_empty() {
            return Ok(());
        }

        let out = match self.icy.as_mut() {
            Some(icy) => icy.interleave(&payload),
            None => payload.clone(),
        };
        let out_len = out.len() as u64;

        self.write_to_sink(out).await?;

        self.stats.payload_bytes += payload.len() as u64;
        self.stats.bytes_sent += out_len;
        if let Some(icy) = &self.icy {
            self.stats.metadata_blocks = icy.blocks_sent();
            self.stats.titles_sent = icy.titles_sent();
        }

        Ok(())
    }

    async fn write_to_sink(&mut self, data: Bytes) -> Result<(), SessionError> {
        let write = tokio::time::timeout(self.config.sink_write_timeout, self.sink.write(data));

        match write.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(SessionError::SlowClientBackpressure)
            }
            Ok(Err(e)) => Err(SessionError::ClientDisconnected(e)),
            Err(_) => Err(SessionError::SlowClientBackpressure),
        }
    }

    /// Release the cursor and finalize statistics
    ///
    /// Safe to call any number of times; only the first call has an effect.
    pub fn close(&mut self) -> &ListenerStats {
        if self.phase == SessionPhase::Closed {
            return &self.stats;
        }
        self.phase = SessionPhase::Closed;

        drop(self.cursor.take());
        self.sink.close();
        self.stats.duration = self.started_at.elapsed();

        tracing::info!(
            listener = self.context.listener_id,
            payload_bytes = self.stats.payload_bytes,
            bytes_sent = self.stats.bytes_sent,
            titles_sent = self.stats.titles_sent,
            underruns = self.stats.underruns,
            duration_secs = self.stats.duration.as_secs(),
            "Listener finished"
        );

        &self.stats
    }
}

impl<S: ClientSink> Drop for ListenSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
