//! # framesink-core
//!
//! Shared protocol library for FrameSink: the frame type, wire-format
//! constants, the sender-side frame encoder, and the incremental
//! [`FrameDecoder`] that reassembles frames from a byte stream.
//!
//! This crate has no dependency on sockets or the filesystem.  The decoder is
//! generic over any [`tokio::io::AsyncRead`] source, so the same code path is
//! exercised by the receiver binary (over a `TcpStream`) and by tests (over
//! in-memory readers with scripted chunk boundaries).
//!
//! # Why an incremental decoder?
//!
//! A stream transport delivers data in arbitrary chunk sizes: one `read` call
//! may return a single byte of a length prefix, or several complete frames at
//! once.  The decoder therefore carries explicit reassembly state across
//! reads and never treats a short read as frame misalignment.  See
//! [`protocol::decoder`] for the state machine.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `framesink_core::FrameDecoder` instead of the full module path.
pub use protocol::decoder::{DecodeError, DecodeStep, FrameDecoder};
pub use protocol::frame::{
    encode_frame, Frame, FORMAT_MARKER, LEN_PREFIX_BYTES, MAX_FRAME_BYTES,
};
