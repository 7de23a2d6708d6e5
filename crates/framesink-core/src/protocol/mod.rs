//! Protocol module containing the frame type, wire constants, and the decoder.

pub mod decoder;
pub mod frame;

pub use decoder::{DecodeError, DecodeStep, FrameDecoder};
pub use frame::{encode_frame, Frame, FORMAT_MARKER, LEN_PREFIX_BYTES, MAX_FRAME_BYTES};
