//! # Error Types
//!
//! Custom error types for Satlog Ingest using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Satlog Ingest
#[derive(Debug, Error)]
pub enum IngestError {
    /// A body line had a recognized shape but could not be turned into records
    #[error("Line parse error in '{line}': {reason}")]
    LineParse { line: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Malformed allow-list file
    #[error("Allow-list error in {}: {source}", path.display())]
    AllowList {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Not a single allow-list file could be found
    #[error("No allow-list files found in {}", .0.display())]
    NoAllowLists(PathBuf),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Downstream notification errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn line_parse(line: &str, reason: impl Into<String>) -> Self {
        IngestError::LineParse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Satlog Ingest
pub type Result<T> = std::result::Result<T, IngestError>;
