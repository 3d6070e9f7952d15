// Centralized error handling module
// Fatal conditions of a sync or publish run, with path and URL context

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for sync and manifest generation runs.
///
/// Only fatal conditions are represented here. Policy warnings (empty download
/// URL, malformed pattern, failed preserve-list save...) are logged and the run
/// continues, so they never become a `SyncError`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// DNS, connect, timeout or body read failures
    #[error("transport error while fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Server answered with something other than 200 OK
    #[error("server returned {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Manifest JSON could not be decoded
    #[error("failed to parse manifest {}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest decoded but violates a structural invariant
    #[error("invalid manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// Configuration JSON could not be decoded
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// File system errors with context
    #[error("I/O error while {operation}{}: {source}", display_path(path))]
    Io {
        operation: String,
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    /// Download URL lookup failed in publish mode
    #[error("URL resolver failed for {file}: {reason}")]
    Resolver { file: String, reason: String },

    /// Background task died before producing a result
    #[error("background task failed: {0}")]
    Task(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}

impl SyncError {
    /// Create an Io error with context about the operation and path
    pub fn io(err: io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        SyncError::Io {
            operation: operation.to_string(),
            path: Some(path.into()),
            source: err,
        }
    }

    /// Create a transport error from anything displayable
    pub fn transport(url: &str, reason: impl ToString) -> Self {
        SyncError::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for DNS/connect/status failures
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport { .. } | SyncError::HttpStatus { .. })
    }

    /// True for malformed manifest content
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            SyncError::ManifestParse { .. } | SyncError::InvalidManifest { .. }
        )
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
