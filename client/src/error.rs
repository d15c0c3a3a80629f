use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Which remote operation failed. This is what a list keeps as its last
/// error and what a UI layer renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FetchFailed,
    OrderSyncFailed,
    TagUpdateFailed,
    DeleteFailed,
    LinkGenerationFailed,
    UploadFailed,
    ShareResolutionFailed,
    AuthFailed,
}

impl ErrorKind {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::FetchFailed => "Failed to fetch files. Please try again later.",
            ErrorKind::OrderSyncFailed => "Failed to save file order",
            ErrorKind::TagUpdateFailed => "Failed to update tags",
            ErrorKind::DeleteFailed => "Failed to delete the file",
            ErrorKind::LinkGenerationFailed => "Failed to generate shareable link",
            ErrorKind::UploadFailed => "Failed to upload files",
            ErrorKind::ShareResolutionFailed => "File not found or inaccessible.",
            ErrorKind::AuthFailed => "Authentication failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Cause of a failed remote call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server replied {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote operation was attempted and failed.
    #[error("{kind}: {source}")]
    Remote {
        kind: ErrorKind,
        #[source]
        source: TransportError,
    },
    /// The addressed record is not in the local list. Nothing was sent.
    #[error("no file {0} in the list")]
    NotFound(String),
    /// The list was dropped before the persistence result arrived.
    #[error("file list was closed before the operation completed")]
    Closed,
    /// Order persistence needs a tokio runtime to run in the background.
    #[error("no tokio runtime to persist the file order")]
    NoRuntime,
    #[error("invalid API uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
}

impl SyncError {
    #[must_use]
    pub fn remote(kind: ErrorKind, source: TransportError) -> Self {
        SyncError::Remote { kind, source }
    }

    /// Error kind of a failed remote operation, `None` for local errors.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SyncError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
