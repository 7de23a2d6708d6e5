//! File-backed implementation of the [`Sink`] port.
//!
//! All sessions of one process run write to the same target path: the first
//! session truncates any previous contents, every later session appends.  The
//! listener owns that decision and picks the matching constructor; the sink
//! itself only knows its open mode.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::application::{Sink, SinkError};

/// Append-only writer for the elementary-stream output file.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
    bytes_written: u64,
}

impl FileSink {
    /// Opens the sink, truncating any previous contents.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] if the file cannot be created.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;
        info!("saving video to {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
            bytes_written: 0,
        })
    }

    /// Opens the sink in append mode, after a previous session's output.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] if the file cannot be opened.
    pub async fn append_to(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;
        info!("appending video to {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
            bytes_written: 0,
        })
    }

    /// The target path this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Payload bytes appended by this sink instance.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn append(&mut self, payload: &[u8]) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or_else(|| {
            SinkError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink already closed",
            ))
        })?;
        file.write_all(payload).await.map_err(SinkError::Write)?;
        self.bytes_written += payload.len() as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(SinkError::Flush)?;
            file.sync_all().await.map_err(SinkError::Flush)?;
            debug!(
                "sink closed: {} bytes written to {}",
                self.bytes_written,
                self.path.display()
            );
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
