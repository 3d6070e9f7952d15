//! Progress and error reporting shared by sync and publish runs.

use std::sync::Arc;

use crate::error::SyncError;

/// Progress information for one file of a run.
///
/// Sent with `downloaded_bytes == 0` when a file starts, with
/// `downloaded_bytes == total_bytes` when it completes, and once at the end of
/// the run with an empty `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub file_name: String,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub processed: usize,
    pub total: usize,
}

impl TransferProgress {
    pub fn new(
        file_name: impl Into<String>,
        downloaded_bytes: u64,
        total_bytes: u64,
        processed: usize,
        total: usize,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            downloaded_bytes,
            total_bytes,
            processed,
            total,
        }
    }

    /// End-of-run marker.
    pub fn finished(total: usize) -> Self {
        Self::new("", 0, 0, total, total)
    }

    pub fn is_finished(&self) -> bool {
        self.file_name.is_empty()
    }
}

/// Type alias for progress callback function
pub type ProgressCallback = Arc<dyn Fn(&TransferProgress) + Send + Sync>;

/// Called exactly once when a run aborts: human-readable message plus cause.
pub type ErrorCallback = Arc<dyn Fn(&str, &SyncError) + Send + Sync>;

/// Callbacks of one run; both optional.
#[derive(Clone, Default)]
pub struct Reporter {
    progress: Option<ProgressCallback>,
    error: Option<ErrorCallback>,
}

impl Reporter {
    pub fn set_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    pub fn set_error(&mut self, callback: ErrorCallback) {
        self.error = Some(callback);
    }

    pub fn progress(&self, progress: TransferProgress) {
        if let Some(cb) = &self.progress {
            cb(&progress);
        }
    }

    pub fn error(&self, message: &str, cause: &SyncError) {
        if let Some(cb) = &self.error {
            cb(message, cause);
        }
    }
}
