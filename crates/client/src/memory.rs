//! In-memory object store with full wire-contract fidelity.
//!
//! Unlike the production backend this implementation honors every quirk the
//! translation layer has to cope with: explicit directory-marker keys,
//! marker-based pagination with continuation tokens, and (optionally) a
//! backend that ignores byte-range requests and streams the whole object.
//! It also counts calls per operation and can inject faults, which is what
//! the daemon's tests assert against.

use std::collections::BTreeMap;
use std::ops::{Bound, Range};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::RwLock;

use crate::api::ObjectClient;
use crate::error::{ClientError, Result};
use crate::types::{GetResponse, ListingPage, ObjectMeta};

#[derive(Debug, Clone)]
struct MemObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Snapshot of per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub head: u64,
    pub get: u64,
    pub list: u64,
}

impl CallCounts {
    /// Total backend round trips.
    pub fn total(&self) -> u64 {
        self.head + self.get + self.list
    }
}

/// In-memory [`ObjectClient`] for tests and local experimentation.
pub struct MemoryClient {
    objects: RwLock<BTreeMap<String, MemObject>>,
    ignore_ranges: AtomicBool,
    faulty: AtomicBool,
    chunk_size: usize,
    heads: AtomicU64,
    gets: AtomicU64,
    lists: AtomicU64,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            ignore_ranges: AtomicBool::new(false),
            faulty: AtomicBool::new(false),
            chunk_size: 1024,
            heads: AtomicU64::new(0),
            gets: AtomicU64::new(0),
            lists: AtomicU64::new(0),
        }
    }

    /// Store an object under `key`.
    pub fn put(&self, key: &str, data: impl Into<Bytes>) {
        self.objects.write().insert(
            key.to_string(),
            MemObject {
                data: data.into(),
                last_modified: Utc::now(),
            },
        );
    }

    /// Store a zero-length directory marker. `key` must end with `/`.
    pub fn put_marker(&self, key: &str) {
        debug_assert!(key.ends_with('/'), "marker keys end with the delimiter");
        self.put(key, Bytes::new());
    }

    /// Remove an object if present.
    pub fn remove(&self, key: &str) {
        self.objects.write().remove(key);
    }

    /// When set, `get_object` streams the whole object regardless of the
    /// requested range.
    pub fn set_ignore_ranges(&self, ignore: bool) {
        self.ignore_ranges.store(ignore, Ordering::SeqCst);
    }

    /// When set, every operation fails with a non-NoSuchKey backend error.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }

    /// Snapshot of the call counters.
    pub fn counts(&self) -> CallCounts {
        CallCounts {
            head: self.heads.load(Ordering::SeqCst),
            get: self.gets.load(Ordering::SeqCst),
            list: self.lists.load(Ordering::SeqCst),
        }
    }

    fn check_fault(&self) -> Result<()> {
        if self.faulty.load(Ordering::SeqCst) {
            Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected backend fault",
            )))
        } else {
            Ok(())
        }
    }

    fn chunked(&self, mut data: Bytes) -> Vec<Result<Bytes>> {
        let mut out = Vec::new();
        while data.len() > self.chunk_size {
            out.push(Ok(data.split_to(self.chunk_size)));
        }
        if !data.is_empty() {
            out.push(Ok(data));
        }
        out
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn head_object(&self, key: &str) -> Result<ObjectMeta> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;

        let objects = self.objects.read();
        match objects.get(key) {
            Some(obj) => Ok(ObjectMeta {
                key: key.to_string(),
                size: obj.data.len() as u64,
                last_modified: obj.last_modified,
            }),
            None => Err(ClientError::NoSuchKey(key.to_string())),
        }
    }

    async fn get_object(&self, key: &str, range: Option<Range<u64>>) -> Result<GetResponse> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;

        let (data, last_modified) = {
            let objects = self.objects.read();
            match objects.get(key) {
                Some(obj) => (obj.data.clone(), obj.last_modified),
                None => return Err(ClientError::NoSuchKey(key.to_string())),
            }
        };

        let object_size = data.len() as u64;
        let body = match range {
            Some(r) if !self.ignore_ranges.load(Ordering::SeqCst) => {
                let start = r.start.min(object_size) as usize;
                let end = r.end.min(object_size) as usize;
                data.slice(start..end)
            }
            _ => data,
        };

        Ok(GetResponse {
            content_length: body.len() as u64,
            object_size,
            last_modified,
            body: futures::stream::iter(self.chunked(body)).boxed(),
        })
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: usize,
        continuation: Option<&str>,
    ) -> Result<ListingPage> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;

        let objects = self.objects.read();

        // Resume strictly after the continuation marker, otherwise start at
        // the first key that can carry the prefix.
        let start: Bound<&str> = match continuation {
            Some(marker) => Bound::Excluded(marker),
            None if !prefix.is_empty() => Bound::Included(prefix),
            None => Bound::Unbounded,
        };

        let mut page = ListingPage::default();
        let mut items = 0usize;
        let mut last_key: Option<String> = None;

        let mut iter = objects
            .range::<str, _>((start, Bound::Unbounded))
            .peekable();

        while let Some((key, obj)) = iter.next() {
            if !key.starts_with(prefix) {
                // Keys sort after the prefix region once they stop matching.
                break;
            }

            if items == max_keys {
                page.truncated = true;
                page.continuation = last_key;
                return Ok(page);
            }

            let rest = &key[prefix.len()..];
            match rest.find(delimiter) {
                Some(idx) => {
                    // Roll the whole group into one common prefix so a page
                    // boundary can never split (and duplicate) it.
                    let group = format!("{}{}", prefix, &rest[..idx + delimiter.len()]);
                    last_key = Some(key.clone());
                    while let Some((next_key, _)) = iter.peek() {
                        if next_key.starts_with(&group) {
                            last_key = Some((*next_key).clone());
                            iter.next();
                        } else {
                            break;
                        }
                    }
                    page.common_prefixes.push(group);
                    items += 1;
                }
                None => {
                    page.objects.push(ObjectMeta {
                        key: key.clone(),
                        size: obj.data.len() as u64,
                        last_modified: obj.last_modified,
                    });
                    last_key = Some(key.clone());
                    items += 1;
                }
            }
        }

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_distinguishes_missing_keys() {
        let client = MemoryClient::new();
        client.put("a.txt", &b"hello"[..]);

        let meta = client.head_object("a.txt").await.unwrap();
        assert_eq!(meta.size, 5);

        let err = client.head_object("b.txt").await.unwrap_err();
        assert!(err.is_no_such_key());
        assert_eq!(client.counts().head, 2);
    }

    #[tokio::test]
    async fn get_clamps_ranges_to_object_size() {
        let client = MemoryClient::new();
        client.put("a.txt", &b"abcdefg"[..]);

        let resp = client.get_object("a.txt", Some(2..100)).await.unwrap();
        assert_eq!(resp.content_length, 5);
        assert_eq!(resp.object_size, 7);

        let resp = client.get_object("a.txt", Some(10..20)).await.unwrap();
        assert_eq!(resp.content_length, 0);
    }

    #[tokio::test]
    async fn get_can_ignore_ranges() {
        let client = MemoryClient::new();
        client.put("a.txt", &b"abcdefg"[..]);
        client.set_ignore_ranges(true);

        let resp = client.get_object("a.txt", Some(0..2)).await.unwrap();
        assert_eq!(resp.content_length, 7);
    }

    #[tokio::test]
    async fn listing_groups_common_prefixes() {
        let client = MemoryClient::new();
        client.put_marker("docs/");
        client.put("docs/readme.txt", &b"abcdefg"[..]);
        client.put("docs/sub/inner.txt", &b"x"[..]);
        client.put("top.txt", &b"y"[..]);

        let page = client.list_objects("", "/", 1000, None).await.unwrap();
        assert_eq!(page.common_prefixes, vec!["docs/".to_string()]);
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].key, "top.txt");
        assert!(!page.truncated);

        let page = client.list_objects("docs/", "/", 1000, None).await.unwrap();
        assert_eq!(page.common_prefixes, vec!["docs/sub/".to_string()]);
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        // The marker key itself is listed; the enumerator filters it out.
        assert_eq!(keys, vec!["docs/", "docs/readme.txt"]);
    }

    #[tokio::test]
    async fn pagination_is_complete_and_duplicate_free() {
        let client = MemoryClient::new();
        for i in 0..10 {
            client.put(&format!("f{:02}.txt", i), &b"data"[..]);
        }
        client.put("dir/a.txt", &b"a"[..]);
        client.put("dir/b.txt", &b"b"[..]);

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = client
                .list_objects("", "/", 3, token.as_deref())
                .await
                .unwrap();
            seen.extend(page.common_prefixes.iter().cloned());
            seen.extend(page.objects.iter().map(|o| o.key.clone()));
            if !page.truncated {
                break;
            }
            token = page.continuation;
        }

        let mut expected: Vec<String> = (0..10).map(|i| format!("f{:02}.txt", i)).collect();
        expected.push("dir/".to_string());
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn faults_are_not_no_such_key() {
        let client = MemoryClient::new();
        client.set_faulty(true);

        let err = client.head_object("a.txt").await.unwrap_err();
        assert!(!err.is_no_such_key());
    }
}
