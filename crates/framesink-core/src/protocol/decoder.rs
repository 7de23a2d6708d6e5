//! Incremental frame reassembly over an arbitrary byte stream.
//!
//! The decoder is an explicit two-state machine so that partial progress
//! survives both short reads and read timeouts:
//!
//! - `Prefix` — fewer than 4 bytes of the length field have arrived.
//! - `Payload` — the declared size is known and `filled` of `declared`
//!   payload bytes have arrived.
//!
//! Every underlying read is bounded by the configured timeout.  An expired
//! read yields [`DecodeStep::TimedOut`] with all accumulated bytes retained,
//! so the caller retries the same logical read — a live producer may pause
//! between frames without losing stream synchronization.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::trace;

use crate::protocol::frame::{Frame, LEN_PREFIX_BYTES, MAX_FRAME_BYTES};

/// Errors that terminate a decode stream.
///
/// Each variant carries enough context (byte counts, declared vs. received
/// sizes) to diagnose a misbehaving sender from the log line alone.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream closed after delivering part of a length prefix.
    #[error("incomplete length prefix: stream closed after {got} of 4 bytes")]
    IncompletePrefix { got: usize },

    /// The declared payload size exceeds the permitted maximum.
    #[error("frame too large: declared {declared} bytes, limit is {max}")]
    FrameTooLarge { declared: u32, max: u32 },

    /// The stream closed before the full declared payload arrived.
    #[error("incomplete frame payload: received {received} of {declared} bytes")]
    IncompletePayload { received: usize, declared: usize },

    /// The underlying transport failed.
    #[error("transport read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of one bounded decode attempt.
#[derive(Debug)]
pub enum DecodeStep {
    /// A complete frame was reassembled.
    Frame(Frame),
    /// A single read exceeded the timeout before the frame completed.
    /// Partial progress is retained; call [`FrameDecoder::decode_step`] again
    /// to resume the same logical read.
    TimedOut,
    /// The peer closed the stream cleanly on a frame boundary.
    EndOfStream,
}

/// Reassembly state carried across reads.
#[derive(Debug)]
enum DecodeState {
    /// Accumulating the 4-byte length prefix.
    Prefix {
        buf: [u8; LEN_PREFIX_BYTES],
        filled: usize,
    },
    /// Accumulating `declared` payload bytes.
    Payload {
        declared: usize,
        buf: Vec<u8>,
        filled: usize,
    },
}

impl DecodeState {
    fn fresh() -> Self {
        DecodeState::Prefix {
            buf: [0; LEN_PREFIX_BYTES],
            filled: 0,
        }
    }
}

/// Reassembles length-prefixed frames from an async byte stream.
pub struct FrameDecoder<R> {
    reader: R,
    read_timeout: Duration,
    max_frame_bytes: u32,
    state: DecodeState,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    /// Creates a decoder with the default [`MAX_FRAME_BYTES`] size limit.
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self::with_max_frame_bytes(reader, read_timeout, MAX_FRAME_BYTES)
    }

    /// Creates a decoder with a custom frame size limit.
    pub fn with_max_frame_bytes(reader: R, read_timeout: Duration, max_frame_bytes: u32) -> Self {
        Self {
            reader,
            read_timeout,
            max_frame_bytes,
            state: DecodeState::fresh(),
        }
    }

    /// Attempts to reassemble the next frame, issuing as many underlying
    /// reads as needed.
    ///
    /// Returns:
    ///
    /// - `Ok(DecodeStep::Frame)` once exactly the declared number of payload
    ///   bytes has accumulated.  A zero declared size yields an empty frame
    ///   without any payload read.
    /// - `Ok(DecodeStep::TimedOut)` when a single read exceeds the timeout;
    ///   state is retained and the call can be repeated to resume.
    /// - `Ok(DecodeStep::EndOfStream)` when the peer closes before any byte
    ///   of the next length prefix.
    ///
    /// # Errors
    ///
    /// [`DecodeError::FrameTooLarge`] for an oversize declaration (checked
    /// after the prefix is fully consumed, before any payload allocation),
    /// [`DecodeError::IncompletePrefix`] / [`DecodeError::IncompletePayload`]
    /// for mid-field closes, and [`DecodeError::Io`] for transport failures.
    /// All errors are terminal: the stream cannot be resynchronized.
    pub async fn decode_step(&mut self) -> Result<DecodeStep, DecodeError> {
        loop {
            match &mut self.state {
                DecodeState::Prefix { buf, filled } => {
                    let read = self.reader.read(&mut buf[*filled..]);
                    let n = match timeout(self.read_timeout, read).await {
                        Err(_) => return Ok(DecodeStep::TimedOut),
                        Ok(res) => res?,
                    };
                    if n == 0 {
                        return if *filled == 0 {
                            Ok(DecodeStep::EndOfStream)
                        } else {
                            Err(DecodeError::IncompletePrefix { got: *filled })
                        };
                    }
                    *filled += n;
                    if *filled < LEN_PREFIX_BYTES {
                        continue;
                    }

                    let declared = u32::from_be_bytes(*buf);
                    if declared > self.max_frame_bytes {
                        return Err(DecodeError::FrameTooLarge {
                            declared,
                            max: self.max_frame_bytes,
                        });
                    }
                    trace!("length prefix complete: {declared} byte payload");
                    if declared == 0 {
                        self.state = DecodeState::fresh();
                        return Ok(DecodeStep::Frame(Frame::new(Vec::new())));
                    }
                    self.state = DecodeState::Payload {
                        declared: declared as usize,
                        buf: vec![0; declared as usize],
                        filled: 0,
                    };
                }
                DecodeState::Payload {
                    declared,
                    buf,
                    filled,
                } => {
                    let read = self.reader.read(&mut buf[*filled..]);
                    let n = match timeout(self.read_timeout, read).await {
                        Err(_) => return Ok(DecodeStep::TimedOut),
                        Ok(res) => res?,
                    };
                    if n == 0 {
                        return Err(DecodeError::IncompletePayload {
                            received: *filled,
                            declared: *declared,
                        });
                    }
                    *filled += n;
                    if *filled < *declared {
                        continue;
                    }

                    let payload = std::mem::take(buf);
                    self.state = DecodeState::fresh();
                    return Ok(DecodeStep::Frame(Frame::new(payload)));
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
