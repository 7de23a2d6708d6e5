//! TCP accept loop and per-connection lifecycle.
//!
//! The receiver deliberately serves **one connection at a time**: each
//! accepted connection is run to completion before the loop returns to
//! `accept`, so a second client can connect (the backlog holds it) but makes
//! no progress until the active session ends.  A failed session never takes
//! the accept loop down; only a bind failure is fatal.
//!
//! Shutdown: `accept` is wrapped in a short poll timeout so the shared
//! `running` flag is observed even when no sender connects.  In-session, the
//! flag is checked between decode steps, bounding shutdown latency by one
//! read timeout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use framesink_core::FrameDecoder;

use crate::application::{SessionRunner, Sink};
use crate::domain::{ConfigError, ReceiverConfig};
use crate::infrastructure::handshake::detect_format_announcement;
use crate::infrastructure::sink::FileSink;

/// How often the accept loop re-checks the `running` flag while idle.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Errors that prevent the receiver from starting.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// The listening endpoint could not be bound; nothing can proceed.
    #[error("failed to bind listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The configured bind address is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The listening receiver: binds once, then serves sessions sequentially.
pub struct Receiver {
    listener: TcpListener,
    config: ReceiverConfig,
    output_path: PathBuf,
    /// Whether a session of this process run has already created the output
    /// file.  The first sink open truncates; all later opens append.
    sink_created: bool,
}

impl Receiver {
    /// Binds the listening endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::Config`] for an unparsable bind address and
    /// [`ReceiverError::BindFailed`] when the endpoint cannot be bound (port
    /// in use, missing privileges).  Both are fatal to startup.
    pub async fn bind(config: ReceiverConfig) -> Result<Self, ReceiverError> {
        let addr = config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ReceiverError::BindFailed { addr, source })?;
        let output_path = config.storage.output_path();
        Ok(Self {
            listener,
            config,
            output_path,
            sink_created: false,
        })
    }

    /// The address actually bound.  With a configured port of 0 this is where
    /// the OS-assigned port shows up.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts and serves one connection at a time until `running` clears.
    ///
    /// Accept errors after a successful bind are logged and the loop
    /// continues; session outcomes never propagate past this loop.
    pub async fn run(mut self, running: Arc<AtomicBool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("listening on {addr}, waiting for connection"),
            Err(e) => warn!("listening (local address unavailable: {e})"),
        }

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("stop requested, leaving accept loop");
                break;
            }

            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                // Poll window elapsed with no connection; re-check the flag.
                Err(_) => continue,
                Ok(Err(e)) => {
                    error!("accept failed: {e}");
                }
                Ok(Ok((stream, peer))) => {
                    info!("connection accepted from {peer}");
                    self.serve_connection(stream, &running).await;
                    info!("waiting for connection");
                }
            }
        }
    }

    /// Runs one connection to completion: sink open, format-announcement
    /// check, decode loop, sink release.  Every failure is contained here.
    async fn serve_connection(&mut self, mut stream: TcpStream, running: &AtomicBool) {
        let session_id = Uuid::new_v4();

        let mut sink = match self.open_sink().await {
            Ok(sink) => sink,
            Err(e) => {
                // No frames from this session could be durably stored, so
                // abort without consuming any data.
                error!("session {session_id}: cannot open sink: {e}");
                return;
            }
        };
        self.sink_created = true;

        if detect_format_announcement(&mut stream, self.config.session.handshake_wait()).await {
            debug!("session {session_id}: format announcement consumed");
        }

        let decoder = FrameDecoder::with_max_frame_bytes(
            stream,
            self.config.session.read_timeout(),
            self.config.session.max_frame_bytes,
        );
        let report = SessionRunner::new(session_id)
            .run(decoder, &mut sink, running)
            .await;

        if let Err(e) = sink.close().await {
            warn!("session {session_id}: failed to close sink: {e}");
        }
        info!(
            "session {session_id} closed: {} frames, {} payload bytes",
            report.frames, report.payload_bytes
        );
    }

    /// First open of a process run truncates; later opens append.
    async fn open_sink(&self) -> Result<FileSink, crate::application::SinkError> {
        if self.sink_created {
            FileSink::append_to(&self.output_path).await
        } else {
            FileSink::create(&self.output_path).await
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ReceiverConfig {
        let mut config = ReceiverConfig::default();
        config.network.bind_address = "127.0.0.1".to_string();
        config.network.port = 0;
        config
    }

    #[tokio::test]
    async fn test_bind_resolves_an_os_assigned_port() {
        let receiver = Receiver::bind(loopback_config()).await.expect("bind");
        let addr = receiver.local_addr().expect("local addr");
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_address() {
        let mut config = loopback_config();
        config.network.bind_address = "not.an.ip".to_string();
        assert!(matches!(
            Receiver::bind(config).await,
            Err(ReceiverError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_failure_on_occupied_port() {
        let first = Receiver::bind(loopback_config()).await.expect("bind");
        let addr = first.local_addr().expect("local addr");

        let mut config = loopback_config();
        config.network.port = addr.port();
        match Receiver::bind(config).await {
            Err(ReceiverError::BindFailed { addr: failed, .. }) => {
                assert_eq!(failed.port(), addr.port());
            }
            Ok(_) => {
                // Some platforms allow rebinding with SO_REUSEADDR semantics;
                // nothing further to assert there.
            }
            Err(other) => panic!("expected BindFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_exits_promptly_once_running_clears() {
        let receiver = Receiver::bind(loopback_config()).await.expect("bind");
        let running = Arc::new(AtomicBool::new(false));

        // With the flag already cleared the loop must exit on its first poll.
        timeout(Duration::from_secs(1), receiver.run(running))
            .await
            .expect("accept loop must exit promptly");
    }
}
