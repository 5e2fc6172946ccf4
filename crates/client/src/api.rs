//! The client trait the translation layer is written against.

use std::ops::Range;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GetResponse, ListingPage, ObjectMeta};

/// Object-storage operations needed to synthesize a filesystem view.
///
/// Implementations must be safe to call concurrently; each call is an
/// independent blocking round trip with no ordering guarantees between
/// distinct keys.
#[async_trait]
pub trait ObjectClient: Send + Sync + 'static {
    /// Probe a single key. Returns [`crate::ClientError::NoSuchKey`] when
    /// the key is absent.
    async fn head_object(&self, key: &str) -> Result<ObjectMeta>;

    /// Fetch object content, optionally limited to a byte range.
    ///
    /// The range is a hint: backends may ignore it and return the whole
    /// object. The response reports the actual body length.
    async fn get_object(&self, key: &str, range: Option<Range<u64>>) -> Result<GetResponse>;

    /// List one page of keys under `prefix`, grouped by `delimiter`.
    ///
    /// Pass the previous page's continuation token to resume a truncated
    /// listing.
    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: usize,
        continuation: Option<&str>,
    ) -> Result<ListingPage>;
}
