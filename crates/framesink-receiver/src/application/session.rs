//! Session use case: drive the frame decoder and forward payloads to the sink.
//!
//! [`SessionRunner`] owns one accepted connection's decode lifecycle.  It
//! depends only on the [`FrameDecoder`] from `framesink-core` and the [`Sink`]
//! port defined here; the TCP stream and the file-backed sink are injected by
//! the infrastructure layer, which keeps the whole state machine unit-testable
//! with in-memory readers and mock sinks.
//!
//! State machine: decode → append → decode …, self-looping on per-read
//! timeouts (a live producer may pause between frames), terminating on clean
//! end of stream, a stop request, or any decode/sink error.  Errors are
//! classified and logged here and never propagate past the runner; the accept
//! loop continues regardless of how a session ends.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};
use uuid::Uuid;

use framesink_core::{DecodeError, DecodeStep, FrameDecoder};

/// How many frames between periodic throughput log lines.
const STATS_EVERY_FRAMES: u64 = 10;

/// Error type for sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output file could not be opened; nothing from this session can be
    /// durably stored.
    #[error("failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An append failed mid-session.
    #[error("failed to append frame payload: {0}")]
    Write(#[source] std::io::Error),

    /// The final flush failed; earlier appends may not be durable.
    #[error("failed to flush output file: {0}")]
    Flush(#[source] std::io::Error),
}

/// Append-only destination for reassembled frame payloads.
///
/// The infrastructure layer provides the file-backed implementation; tests
/// inject mocks.  Payloads are written verbatim in arrival order — the wire
/// protocol's length prefixes are never re-inserted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sink: Send {
    /// Appends one payload.
    async fn append(&mut self, payload: &[u8]) -> Result<(), SinkError>;

    /// Flushes and releases the underlying resource.  Idempotent; invoked on
    /// every session-exit path by the owning connection handler.
    async fn close(&mut self) -> Result<(), SinkError>;
}

/// Terminal condition of one session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The peer closed cleanly on a frame boundary.
    EndOfStream,
    /// An external stop request ended the session between frames.
    Stopped,
    /// The transport reported a connection reset.
    ConnectionReset,
    /// The decode stream ended with a protocol or transport error.
    Decode(DecodeError),
    /// The sink rejected a write; received data can no longer be persisted.
    Sink(SinkError),
}

/// What a finished session did, with counters for diagnostics.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub frames: u64,
    pub payload_bytes: u64,
    pub outcome: SessionOutcome,
}

/// Owns one accepted connection's decode lifecycle.
pub struct SessionRunner {
    session_id: Uuid,
    started: Instant,
    frames: u64,
    payload_bytes: u64,
}

impl SessionRunner {
    /// Creates a runner for a freshly accepted connection.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            started: Instant::now(),
            frames: 0,
            payload_bytes: 0,
        }
    }

    /// Drives the decoder until a terminal condition, forwarding every
    /// complete frame payload to `sink`.
    ///
    /// Read timeouts are not terminal: the same logical read is retried with
    /// no progress lost.  The `running` flag is observed between decode
    /// steps, so shutdown latency is bounded by one read timeout.
    pub async fn run<R, S>(
        mut self,
        mut decoder: FrameDecoder<R>,
        sink: &mut S,
        running: &AtomicBool,
    ) -> SessionReport
    where
        R: AsyncRead + Unpin,
        S: Sink,
    {
        let id = self.session_id;
        let outcome = loop {
            if !running.load(Ordering::Relaxed) {
                break SessionOutcome::Stopped;
            }
            match decoder.decode_step().await {
                Ok(DecodeStep::Frame(frame)) => {
                    if let Err(e) = sink.append(&frame.payload).await {
                        break SessionOutcome::Sink(e);
                    }
                    self.frames += 1;
                    self.payload_bytes += frame.len() as u64;
                    debug!("session {id}: frame {} ({} bytes) persisted", self.frames, frame.len());
                    if self.frames % STATS_EVERY_FRAMES == 0 {
                        let elapsed = self.started.elapsed().as_secs_f64();
                        let fps = if elapsed > 0.0 {
                            self.frames as f64 / elapsed
                        } else {
                            0.0
                        };
                        info!("session {id}: received {} frames, {fps:.2} frames/s", self.frames);
                    }
                }
                Ok(DecodeStep::TimedOut) => {
                    debug!("session {id}: read timed out, retrying");
                }
                Ok(DecodeStep::EndOfStream) => {
                    break SessionOutcome::EndOfStream;
                }
                Err(DecodeError::Io(e))
                    if e.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    break SessionOutcome::ConnectionReset;
                }
                Err(e) => {
                    break SessionOutcome::Decode(e);
                }
            }
        };
        self.finish(outcome)
    }

    /// Logs the terminal condition and produces the report.
    fn finish(self, outcome: SessionOutcome) -> SessionReport {
        let id = self.session_id;
        let elapsed = self.started.elapsed().as_secs_f64();
        let avg_fps = if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        };
        match &outcome {
            SessionOutcome::EndOfStream => {
                info!("session {id}: peer closed the stream");
            }
            SessionOutcome::Stopped => {
                info!("session {id}: stop requested");
            }
            SessionOutcome::ConnectionReset => {
                warn!("session {id}: connection reset by peer");
            }
            SessionOutcome::Decode(e) => {
                warn!("session {id}: decoding ended: {e}");
            }
            SessionOutcome::Sink(e) => {
                warn!("session {id}: sink failed: {e}");
            }
        }
        info!(
            "session {id}: {} frames, {} payload bytes, {avg_fps:.2} frames/s average",
            self.frames, self.payload_bytes
        );
        SessionReport {
            session_id: self.session_id,
            frames: self.frames,
            payload_bytes: self.payload_bytes,
            outcome,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
