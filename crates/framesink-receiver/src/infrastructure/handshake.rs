//! Format-announcement detection on a freshly accepted connection.
//!
//! A sender may transmit a 4-byte `"HEVC"` marker once, before the first
//! frame.  Detection is best-effort by design: the marker is peeked
//! (`MSG_PEEK` semantics — observed without being removed from the stream)
//! under a bounded wait, and only an exact match is consumed.  Absence, a
//! differing value, a timeout, or a transport error all mean "proceed
//! straight to frame decoding with every byte still unread" — a missing
//! vendor preamble must never prevent frame reception.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use framesink_core::FORMAT_MARKER;

/// Re-poll interval when a matching marker prefix is visible but incomplete.
const PARTIAL_PEEK_POLL: Duration = Duration::from_millis(20);

/// Checks whether the connection opens with the format announcement.
///
/// Returns `true` after consuming exactly the 4 marker bytes, leaving the
/// stream positioned on the first length prefix.  Returns `false` in every
/// other case, with all peeked bytes still available to the decoder.
pub async fn detect_format_announcement(stream: &mut TcpStream, wait: Duration) -> bool {
    let deadline = Instant::now() + wait;
    let mut peeked = [0u8; FORMAT_MARKER.len()];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!("no format announcement within {wait:?}, continuing to frame reception");
            return false;
        }

        let n = match timeout(remaining, stream.peek(&mut peeked)).await {
            Err(_) => {
                debug!("no format announcement within {wait:?}, continuing to frame reception");
                return false;
            }
            Ok(Err(e)) => {
                warn!("error while checking for format announcement: {e}");
                return false;
            }
            Ok(Ok(n)) => n,
        };

        if n == 0 {
            // Peer closed without sending anything; the decoder will report
            // a clean end of stream.
            return false;
        }
        if peeked[..n] != FORMAT_MARKER[..n] {
            debug!("first bytes are not a format announcement: {:02X?}", &peeked[..n]);
            return false;
        }
        if n < FORMAT_MARKER.len() {
            // A matching prefix is visible but incomplete; re-poll within the
            // wait window rather than spinning on peek.
            sleep(PARTIAL_PEEK_POLL).await;
            continue;
        }

        // Exact match: remove the marker so decoding starts on the first
        // length prefix.
        let mut consumed = [0u8; FORMAT_MARKER.len()];
        if let Err(e) = stream.read_exact(&mut consumed).await {
            warn!("failed to consume format announcement: {e}");
            return false;
        }
        info!("received HEVC format announcement");
        return true;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
