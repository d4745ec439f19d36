//! Error types for backlog-parser.
//!
//! Only document-level failures are errors. Problems local to one story or
//! task become [`backlog_core::ParseWarning`]s and the run continues.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal parse failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The epic document is absent; there is nothing to sync.
    #[error("required document missing: {path}")]
    MissingRequiredDocument { path: PathBuf },

    /// Neither the config nor the command line named an epic document.
    #[error("no epic document configured; set `epics` in the config or pass --epics")]
    EpicsNotConfigured,

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`ParseError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ParseError {
    ParseError::Io {
        path: path.into(),
        source,
    }
}
