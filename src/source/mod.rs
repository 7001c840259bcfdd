//! # Log Source Module
//!
//! Incremental reads of the append-only debug log.
//!
//! This module handles:
//! - The byte-offset bookmark of the last fully processed line
//! - Rotation/truncation detection (file shorter than the bookmark)
//! - Deferring a partial final line to the next read
//! - Trigger sources that decide when a read cycle runs

pub mod trigger;

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use crate::error::Result;

pub use trigger::{RunFlag, Trigger, TriggerSources};

/// Complete lines read since the bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// Decoded text, always ending in a newline unless empty
    pub text: String,
    /// Offset the read started from
    pub start_offset: u64,
    /// Offset just past the last complete line; commit this once processed
    pub end_offset: u64,
    /// The file shrank below the bookmark and is being read from the start
    pub rotated: bool,
}

/// Reader of new bytes from one log file.
#[derive(Debug, Clone)]
pub struct LogSource {
    path: PathBuf,
    last_position: u64,
}

impl LogSource {
    /// Source reading the whole file from offset zero.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            last_position: 0,
        }
    }

    /// Source whose bookmark starts at the current end of the file when
    /// `start_from_end` is set, so existing history is not replayed.
    pub async fn open<P: Into<PathBuf>>(path: P, start_from_end: bool) -> Result<Self> {
        let mut source = Self::new(path);
        if start_from_end {
            source.last_position = match fs::metadata(&source.path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(
                        "Log file {} not found yet, will read from the start once it appears",
                        source.path.display()
                    );
                    0
                }
                Err(e) => return Err(e.into()),
            };
        }
        info!("Watching {} from offset {}", source.path.display(), source.last_position);
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset of the first byte not yet processed.
    pub fn last_position(&self) -> u64 {
        self.last_position
    }

    /// Read complete lines appended since the bookmark.
    ///
    /// Returns `Ok(None)` when the file is missing or holds no new complete
    /// line. A file shorter than the bookmark resets the bookmark to zero and
    /// yields a chunk flagged `rotated`, possibly with empty text.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read.
    pub async fn read_new(&mut self) -> Result<Option<LogChunk>> {
        let len = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Log file {} not found, skipping cycle", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut rotated = false;
        if len < self.last_position {
            warn!(
                "Log file shrank from {} to {} bytes, reading from the start",
                self.last_position, len
            );
            self.last_position = 0;
            rotated = true;
        }

        let start = self.last_position;
        let empty = LogChunk {
            text: String::new(),
            start_offset: start,
            end_offset: start,
            rotated,
        };
        if len == start {
            return Ok(rotated.then_some(empty));
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buf = Vec::with_capacity(usize::try_from(len - start).unwrap_or_default());
        file.take(len - start).read_to_end(&mut buf).await?;

        let complete = buf.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        if complete < buf.len() {
            debug!("Deferring {} bytes of partial line", buf.len() - complete);
        }
        if complete == 0 {
            return Ok(rotated.then_some(empty));
        }

        buf.truncate(complete);
        Ok(Some(LogChunk {
            text: String::from_utf8_lossy(&buf).into_owned(),
            start_offset: start,
            end_offset: start + complete as u64,
            rotated,
        }))
    }

    /// Advance the bookmark past a processed chunk.
    pub fn commit(&mut self, end_offset: u64) {
        debug!("Bookmark {} -> {}", self.last_position, end_offset);
        self.last_position = end_offset;
    }
}
