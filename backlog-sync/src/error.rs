//! Error types for backlog-sync.

use std::path::PathBuf;

use thiserror::Error;

use backlog_core::StoreError;
use backlog_parser::ParseError;

/// All errors that can arise from planning or write-back.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A fatal parse failure (missing epic document, unreadable directory).
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Loading or saving the sync-state snapshot failed.
    #[error("sync state error: {0}")]
    State(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Plan or results JSON could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
