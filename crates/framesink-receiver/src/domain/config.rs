//! Receiver configuration.
//!
//! [`ReceiverConfig`] is the single source of truth for all runtime settings.
//! It can be deserialized from a TOML file, overridden by CLI flags (the
//! startup glue in `main.rs` does both), or constructed from defaults for
//! tests.
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a partial
//! config file works correctly.
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 12345
//!
//! [storage]
//! save_dir = "received_frames"
//!
//! [session]
//! read_timeout_secs = 5
//! ```

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use framesink_core::MAX_FRAME_BYTES;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configured bind address is not a valid IP address.
    #[error("invalid bind address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Listening endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port senders connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Directory the output file is written into.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    /// File name of the elementary-stream output inside `save_dir`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

/// Per-session timing and validation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Seconds to wait for the optional format announcement on a fresh
    /// connection before proceeding straight to frame decoding.
    #[serde(default = "default_handshake_wait_secs")]
    pub handshake_wait_secs: u64,
    /// Per-read timeout in seconds during frame reception.  An expired read
    /// is retried, not fatal: a live producer may pause between frames.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Largest payload a sender may declare, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    12345
}
fn default_save_dir() -> PathBuf {
    PathBuf::from("received_frames")
}
fn default_file_name() -> String {
    "output.h265".to_string()
}
fn default_handshake_wait_secs() -> u64 {
    1
}
fn default_read_timeout_secs() -> u64 {
    5
}
fn default_max_frame_bytes() -> u32 {
    MAX_FRAME_BYTES
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            file_name: default_file_name(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_wait_secs: default_handshake_wait_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

// ── Accessors ─────────────────────────────────────────────────────────────────

impl ReceiverConfig {
    /// Loads a config from a TOML file.  Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors and
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Resolves the listening socket address from the network section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` does not
    /// parse as an IP address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr =
            self.network
                .bind_address
                .parse()
                .map_err(|source| ConfigError::InvalidAddress {
                    addr: self.network.bind_address.clone(),
                    source,
                })?;
        Ok(SocketAddr::new(ip, self.network.port))
    }
}

impl StorageConfig {
    /// Full path of the output artifact.
    pub fn output_path(&self) -> PathBuf {
        self.save_dir.join(&self.file_name)
    }
}

impl SessionConfig {
    /// Bounded wait for the format announcement peek.
    pub fn handshake_wait(&self) -> Duration {
        Duration::from_secs(self.handshake_wait_secs)
    }

    /// Per-read timeout during frame reception.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_values() {
        let cfg = ReceiverConfig::default();
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.network.port, 12345);
        assert_eq!(cfg.storage.save_dir, PathBuf::from("received_frames"));
        assert_eq!(cfg.storage.file_name, "output.h265");
        assert_eq!(cfg.session.handshake_wait_secs, 1);
        assert_eq!(cfg.session.read_timeout_secs, 5);
        assert_eq!(cfg.session.max_frame_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_output_path_joins_dir_and_file_name() {
        let cfg = ReceiverConfig::default();
        assert_eq!(
            cfg.storage.output_path(),
            PathBuf::from("received_frames").join("output.h265")
        );
    }

    #[test]
    fn test_listen_addr_resolves_default() {
        let cfg = ReceiverConfig::default();
        let addr = cfg.listen_addr().expect("default address must parse");
        assert_eq!(addr.to_string(), "0.0.0.0:12345");
    }

    #[test]
    fn test_listen_addr_rejects_garbage() {
        let mut cfg = ReceiverConfig::default();
        cfg.network.bind_address = "not.an.ip".to_string();
        assert!(matches!(
            cfg.listen_addr(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: ReceiverConfig = toml::from_str("").expect("empty TOML is valid");
        assert_eq!(cfg, ReceiverConfig::default());
    }

    #[test]
    fn test_deserialize_partial_section_keeps_other_defaults() {
        let toml_str = r#"
[network]
port = 9000
"#;
        let cfg: ReceiverConfig = toml::from_str(toml_str).expect("partial TOML is valid");
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.bind_address, "0.0.0.0");
        assert_eq!(cfg.session.read_timeout_secs, 5);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = ReceiverConfig::default();
        cfg.network.port = 4321;
        cfg.storage.save_dir = PathBuf::from("/tmp/frames");
        cfg.session.max_frame_bytes = 1024;

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ReceiverConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_deserialize_invalid_toml_is_a_parse_error() {
        let result: Result<ReceiverConfig, toml::de::Error> = toml::from_str("[[[ nope");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let result = ReceiverConfig::load(Path::new("/nonexistent/framesink/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
