//! Error taxonomy for the ingestion pipeline.
//!
//! Every fatal condition surfaces as one [`IngestError`] variant so callers can
//! report ceiling breaches, bad input and git failures distinctly. Per-item
//! failures during a scan (an unreadable file, a broken symlink, an unlistable
//! directory) are absorbed where they occur and never reach this type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A pattern contained a character outside the allowed set.
    #[error("invalid pattern '{pattern}': only alphanumerics and -_./+*@ are allowed")]
    InvalidPattern { pattern: String },

    /// The source string could not be resolved to a repository.
    #[error("invalid repository source: {0}")]
    InvalidUrl(String),

    /// The remote repository does not exist or could not be reached.
    #[error("repository '{0}' not found or not reachable")]
    RepositoryNotFound(String),

    /// The scan visited more files than the configured ceiling allows.
    #[error("maximum file count exceeded: limit is {limit} files")]
    MaxFilesExceeded { limit: u64 },

    /// The scan accumulated more bytes than the configured ceiling allows.
    #[error("maximum total size exceeded: limit is {limit} bytes")]
    MaxTotalBytesExceeded { limit: u64 },

    /// Single-file ingestion was asked for a file that is not text.
    #[error("not a text file: {}", .0.display())]
    NotATextFile(PathBuf),

    /// An external git invocation failed or could not be launched.
    #[error("{command} failed: {message}")]
    Git { command: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub(crate) fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Git {
            command: command.into(),
            message: message.into(),
        }
    }
}
