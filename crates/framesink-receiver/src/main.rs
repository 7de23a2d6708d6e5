//! FrameSink receiver — entry point.
//!
//! Listens for a single TCP sender transmitting length-prefixed encoded video
//! frames and appends the payloads to a raw `.h265` elementary-stream file.
//!
//! # Usage
//!
//! ```text
//! framesink-receiver [OPTIONS]
//!
//! Options:
//!   --config   <PATH>  TOML config file; flags below override its values
//!   --bind     <IP>    IP address to listen on [default: 0.0.0.0]
//!   --port     <PORT>  TCP port to listen on [default: 12345]
//!   --save-dir <DIR>   Output directory [default: received_frames]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Flag         |
//! |----------------------|--------------|
//! | `FRAMESINK_CONFIG`   | `--config`   |
//! | `FRAMESINK_BIND`     | `--bind`     |
//! | `FRAMESINK_PORT`     | `--port`     |
//! | `FRAMESINK_SAVE_DIR` | `--save-dir` |
//!
//! Log verbosity is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use framesink_receiver::domain::ReceiverConfig;
use framesink_receiver::infrastructure::Receiver;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// FrameSink video frame receiver.
///
/// Accepts one TCP connection at a time and appends every received frame
/// payload, in arrival order, to `<save-dir>/output.h265`.
#[derive(Debug, Parser)]
#[command(
    name = "framesink-receiver",
    about = "Receive length-prefixed video frames over TCP into an elementary-stream file",
    version
)]
struct Cli {
    /// Path to a TOML config file; the flags below override its values.
    #[arg(long, env = "FRAMESINK_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.  `0.0.0.0` accepts connections from any
    /// interface; `127.0.0.1` accepts only local senders.
    #[arg(long, env = "FRAMESINK_BIND")]
    bind: Option<String>,

    /// TCP port senders connect to.
    #[arg(long, env = "FRAMESINK_PORT")]
    port: Option<u16>,

    /// Directory the received video file is saved into.
    #[arg(long, env = "FRAMESINK_SAVE_DIR")]
    save_dir: Option<PathBuf>,
}

impl Cli {
    /// Resolves the effective configuration: config file (if given), then
    /// flag overrides, then built-in defaults for everything else.
    fn into_config(self) -> anyhow::Result<ReceiverConfig> {
        let mut config = match &self.config {
            Some(path) => ReceiverConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ReceiverConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(save_dir) = self.save_dir {
            config.storage.save_dir = save_dir;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; level overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;

    // The output directory is created up front so the first session's sink
    // open cannot fail on a missing path.
    std::fs::create_dir_all(&config.storage.save_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.storage.save_dir.display()
        )
    })?;

    info!("FrameSink receiver starting");
    info!(
        "received video will be saved to {}",
        config.storage.output_path().display()
    );

    // Shutdown flag shared with the accept loop and active sessions.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down after the current read");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let receiver = Receiver::bind(config)
        .await
        .context("failed to start receiver")?;
    receiver.run(running).await;

    info!("FrameSink receiver stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_at_reference_values() {
        let cli = Cli::parse_from(["framesink-receiver"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config, ReceiverConfig::default());
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli::parse_from(["framesink-receiver", "--bind", "127.0.0.1"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["framesink-receiver", "--port", "9999"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.network.port, 9999);
    }

    #[test]
    fn test_cli_save_dir_override() {
        let cli = Cli::parse_from(["framesink-receiver", "--save-dir", "/tmp/frames"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.storage.save_dir, PathBuf::from("/tmp/frames"));
    }

    #[test]
    fn test_cli_missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "framesink-receiver",
            "--config",
            "/nonexistent/framesink.toml",
        ]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let dir = std::env::temp_dir().join(format!(
            "framesink_cli_test_{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[network]\nport = 4000\nbind_address = \"10.0.0.1\"\n").unwrap();

        let cli = Cli::parse_from([
            "framesink-receiver",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "5000",
        ]);
        let config = cli.into_config().unwrap();

        // The flag wins over the file; untouched file values survive.
        assert_eq!(config.network.port, 5000);
        assert_eq!(config.network.bind_address, "10.0.0.1");

        std::fs::remove_dir_all(&dir).ok();
    }
}
