//! Frame type and wire-format constants.
//!
//! Wire format:
//! ```text
//! +----------------------+------------------------------+
//! | length (u32, BE)     | payload (length bytes)       |
//! +----------------------+------------------------------+
//!      4 bytes                variable
//! ```
//! The length field counts payload bytes only; it is never written to the
//! output artifact.  An optional 4-byte format announcement (`"HEVC"`) may
//! precede the first frame of a connection.  The receiver detects and consumes
//! it before frame decoding begins, so the announcement never reaches the
//! decoder.

/// Number of bytes in the length prefix preceding every frame payload.
pub const LEN_PREFIX_BYTES: usize = 4;

/// Largest payload a sender may declare, in bytes (10 MiB).
///
/// The protocol has no frame-boundary recovery mechanism, so a corrupted
/// length field poisons the rest of the stream.  A declaration above this
/// limit is rejected before any payload byte is read and ends the session.
pub const MAX_FRAME_BYTES: u32 = 10 * 1024 * 1024;

/// The optional format announcement a sender may transmit once, before the
/// first frame.  Absence or a differing value is not an error.
pub const FORMAT_MARKER: [u8; 4] = *b"HEVC";

/// One reassembled unit of payload data.
///
/// The decoder only ever constructs a `Frame` whose payload length equals the
/// size the sender declared; a frame is never partially materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The payload bytes, exactly as they arrived.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Wraps a fully reassembled payload.
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// Payload length in bytes (the size the sender declared).
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// `true` for a frame with a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Encodes one frame for transmission: length prefix followed by the payload.
///
/// Senders and tests share this single implementation of the wire format, so
/// `decode(encode(payload))` round-trips by construction.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LEN_PREFIX_BYTES + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_prepends_big_endian_length() {
        let bytes = encode_frame(b"abc");
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_encode_frame_empty_payload_is_four_zero_bytes() {
        let bytes = encode_frame(b"");
        assert_eq!(bytes, [0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_format_marker_is_ascii_hevc() {
        assert_eq!(&FORMAT_MARKER, b"HEVC");
        assert_eq!(FORMAT_MARKER, [0x48, 0x45, 0x56, 0x43]);
    }

    #[test]
    fn test_max_frame_bytes_is_ten_mebibytes() {
        assert_eq!(MAX_FRAME_BYTES, 10_485_760);
    }

    #[test]
    fn test_frame_len_matches_payload() {
        let frame = Frame::new(vec![0u8; 42]);
        assert_eq!(frame.len(), 42);
        assert!(!frame.is_empty());
        assert!(Frame::new(Vec::new()).is_empty());
    }
}
