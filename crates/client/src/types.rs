//! Wire types shared by all client implementations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::ClientError;

/// Metadata for a single stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full storage key (no leading slash).
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last-modified timestamp reported by the backend.
    pub last_modified: DateTime<Utc>,
}

/// One page of a delimiter-bounded listing.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Grouping keys for inferred directories; each ends with the delimiter.
    pub common_prefixes: Vec<String>,
    /// Objects directly under the scanned prefix, in backend order.
    pub objects: Vec<ObjectMeta>,
    /// Opaque token to resume listing; present only when `truncated`.
    pub continuation: Option<String>,
    /// Whether more results remain beyond this page.
    pub truncated: bool,
}

/// A content fetch: the response body plus what the backend claims about it.
///
/// `content_length` is the length of the body as reported by the backend,
/// which is *not* necessarily the requested range — some stores silently
/// return the whole object. Comparing it against `object_size` tells a
/// clamped range apart from an ignored one; callers must verify before
/// consuming.
pub struct GetResponse {
    /// Reported length of the response body in bytes.
    pub content_length: u64,
    /// Total size of the stored object in bytes.
    pub object_size: u64,
    /// Last-modified timestamp of the object.
    pub last_modified: DateTime<Utc>,
    /// The body as a chunked byte stream; dropped when no longer needed.
    pub body: BoxStream<'static, Result<Bytes, ClientError>>,
}

impl std::fmt::Debug for GetResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetResponse")
            .field("content_length", &self.content_length)
            .field("object_size", &self.object_size)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}
