//! Error types for the object-storage client.

/// Errors surfaced by an [`crate::ObjectClient`] implementation.
///
/// `NoSuchKey` is the only recoverable variant: callers translate it into
/// their own not-found result. Every other variant is a backend fault and
/// must not be folded into not-found.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The probed key does not exist in the bucket.
    #[error("no such key: {0}")]
    NoSuchKey(String),

    /// Object storage error
    #[error("object storage error: {0}")]
    Backend(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Whether this is the backend's "no such key" signal.
    pub fn is_no_such_key(&self) -> bool {
        matches!(self, ClientError::NoSuchKey(_))
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
