//! Error taxonomy for the translation layer.
//!
//! `NotFound` is the only recoverable variant; the FUSE adapter maps it to
//! the host's native "no such file". Everything else is fatal for the single
//! operation that raised it and surfaces as an I/O error. A backend fault is
//! never folded into `NotFound` — that would mask an outage as missing files.

use client::ClientError;

/// Errors raised by [`crate::BucketFs`] operations.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path does not exist in the bucket.
    #[error("no such path: {0}")]
    NotFound(String),

    /// The path is not rooted at `/`.
    #[error("invalid path {0:?}: paths are rooted at '/'")]
    InvalidPath(String),

    /// The requested read cannot be buffered.
    #[error("read of {requested} bytes exceeds the {limit} byte buffer limit")]
    ReadTooLarge { requested: usize, limit: usize },

    /// Any backend failure other than "no such key".
    #[error("backend error for {path}: {source}")]
    Backend {
        path: String,
        #[source]
        source: ClientError,
    },
}

impl FsError {
    pub(crate) fn backend(path: &str, source: ClientError) -> Self {
        FsError::Backend {
            path: path.to_string(),
            source,
        }
    }

    /// Whether this maps to the host's "no such file" result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}
