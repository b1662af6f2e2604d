//! Error handling
//!
//! Provides typed errors for store and file operations. An error aborts the
//! operation in progress (one annotation on import, one source on export);
//! non-fatal conditions are logged as warnings instead.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while importing or exporting annotations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Request could not be completed (connection refused, timeout, ...)
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Server answered with a status the operation cannot accept
    #[error("{status} for url: {url}")]
    Status { url: String, status: StatusCode },

    /// Document does not have the expected shape
    #[error("Format error: {0}")]
    Format(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL could not be parsed or joined
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Shorthand for a [`SyncError::Format`] error
    pub fn format(details: impl Into<String>) -> Self {
        SyncError::Format(details.into())
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            SyncError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
