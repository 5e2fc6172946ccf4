//! The translation core: filesystem semantics synthesized over a flat
//! object-storage bucket.
//!
//! [`BucketFs`] answers the three questions the kernel plumbing asks —
//! what is this path (`resolve`), what are this directory's children
//! (`list`), and what bytes does this file hold (`read`) — by issuing
//! metadata probes, delimiter-bounded listings, and ranged reads against an
//! [`ObjectClient`]. Directories do not exist in the backend; they are
//! inferred from common prefixes and zero-length marker keys. The negative
//! cache and known-directory set in [`cache`] keep repeated probes
//! affordable.

mod cache;
pub mod path;

pub use cache::PathCaches;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;

use client::ObjectClient;

use crate::error::FsError;

/// Classification of a path, derived from backend responses plus cache
/// state. Never stored authoritatively; "not found" is [`FsError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    File {
        size: u64,
        mtime: DateTime<Utc>,
    },
    /// `mtime` is `None` for directories known only through a listing;
    /// callers synthesize a timestamp.
    Directory {
        mtime: Option<DateTime<Utc>>,
    },
}

impl Attr {
    pub fn is_dir(&self) -> bool {
        matches!(self, Attr::Directory { .. })
    }
}

/// One child emitted during directory enumeration. Emission order follows
/// the backend; callers needing determinism sort independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Tunables for one filesystem instance.
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Expiry window for negative-cache entries.
    pub negative_ttl: Duration,
    /// Page-size hint for listing requests.
    pub page_size: usize,
    /// Ceiling on a single read's buffer.
    pub max_read: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            negative_ttl: Duration::from_secs(3600),
            page_size: 1000,
            max_read: 64 * 1024 * 1024,
        }
    }
}

/// Well-known probe files that file managers request incessantly; answered
/// not-found without a round trip.
const IGNORED_BASENAMES: &[&str] = &[
    ".DS_Store",
    ".Spotlight-V100",
    ".Trashes",
    ".hidden",
    ".metadata_never_index",
    "autorun.inf",
];

/// Basenames with this prefix (macOS resource forks) are ignored too.
const IGNORE_PREFIX: &str = "._";

fn is_noise(name: &str) -> bool {
    name.starts_with(IGNORE_PREFIX) || IGNORED_BASENAMES.contains(&name)
}

/// A read-only filesystem view of one bucket.
///
/// Safe for concurrent use: every operation may block independently on its
/// own backend call, and the caches tolerate lost updates.
pub struct BucketFs {
    client: Arc<dyn ObjectClient>,
    caches: PathCaches,
    config: FsConfig,
    started_at: DateTime<Utc>,
}

impl BucketFs {
    pub fn new(client: Arc<dyn ObjectClient>, config: FsConfig) -> Self {
        Self {
            caches: PathCaches::new(config.negative_ttl),
            client,
            config,
            started_at: Utc::now(),
        }
    }

    /// Timestamp used for the synthetic root and for directories with no
    /// marker object of their own.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Classify `path` as a file, a directory, or not-found.
    ///
    /// The backend has no "stat a key-or-prefix" call, so a miss on the bare
    /// key is followed by a probe for the `key/` marker — unless a prior
    /// listing already proved the directory exists, which skips that second
    /// round trip entirely.
    pub async fn resolve(&self, fs_path: &str) -> Result<Attr, FsError> {
        path::validate(fs_path)?;

        if fs_path == "/" {
            return Ok(Attr::Directory {
                mtime: Some(self.started_at),
            });
        }

        if is_noise(path::basename(fs_path)) {
            return Err(FsError::NotFound(fs_path.to_string()));
        }

        if self.caches.is_missing(fs_path) {
            tracing::trace!(path = fs_path, "negative cache hit");
            return Err(FsError::NotFound(fs_path.to_string()));
        }

        let key = path::strip_root(fs_path);
        match self.client.head_object(key).await {
            Ok(meta) => Ok(Attr::File {
                size: meta.size,
                mtime: meta.last_modified,
            }),
            Err(e) if e.is_no_such_key() => {
                if self.caches.is_known_directory(fs_path) {
                    return Ok(Attr::Directory { mtime: None });
                }
                let marker = format!("{key}/");
                match self.client.head_object(&marker).await {
                    Ok(meta) => Ok(Attr::Directory {
                        mtime: Some(meta.last_modified),
                    }),
                    Err(e2) if e2.is_no_such_key() => {
                        self.caches.note_missing(fs_path);
                        Err(FsError::NotFound(fs_path.to_string()))
                    }
                    Err(e2) => Err(FsError::backend(fs_path, e2)),
                }
            }
            Err(e) => Err(FsError::backend(fs_path, e)),
        }
    }

    /// Enumerate the immediate children of `fs_path` into `sink`, paging
    /// over the backend's listing protocol.
    ///
    /// Listing a nonexistent directory is an error, not an empty result.
    pub async fn list(
        &self,
        fs_path: &str,
        sink: &mut dyn FnMut(DirEntry),
    ) -> Result<(), FsError> {
        path::validate(fs_path)?;

        let prefix = if fs_path == "/" {
            String::new()
        } else {
            let key = path::strip_root(fs_path);
            let marker = format!("{key}/");
            if !self.caches.is_known_directory(fs_path) {
                match self.client.head_object(&marker).await {
                    Ok(_) => self.caches.note_directory(fs_path),
                    Err(e) if e.is_no_such_key() => {
                        return Err(FsError::NotFound(fs_path.to_string()));
                    }
                    Err(e) => return Err(FsError::backend(fs_path, e)),
                }
            }
            marker
        };

        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects(&prefix, "/", self.config.page_size, continuation.as_deref())
                .await
                .map_err(|e| FsError::backend(fs_path, e))?;

            for common_prefix in &page.common_prefixes {
                let child = common_prefix
                    .strip_suffix('/')
                    .unwrap_or(common_prefix.as_str());
                let child_path = format!("/{child}");
                self.caches.note_directory(&child_path);
                // A prior not-found answer for this path is now proven wrong.
                self.caches.forget_missing(&child_path);
                sink(DirEntry {
                    name: path::basename(&child_path).to_string(),
                    is_dir: true,
                });
            }

            for object in &page.objects {
                // The directory's own marker is not one of its children.
                if object.key == prefix {
                    continue;
                }
                let child_path = format!("/{}", object.key);
                self.caches.forget_missing(&child_path);
                sink(DirEntry {
                    name: path::basename(&child_path).to_string(),
                    is_dir: false,
                });
            }

            if !page.truncated {
                break;
            }
            // A truncated page without a token cannot make progress.
            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(())
    }

    /// Convenience wrapper collecting [`Self::list`] output into a vector.
    pub async fn list_collected(&self, fs_path: &str) -> Result<Vec<DirEntry>, FsError> {
        let mut entries = Vec::new();
        self.list(fs_path, &mut |entry| entries.push(entry)).await?;
        Ok(entries)
    }

    /// Read up to `len` bytes of `fs_path` starting at `offset`.
    ///
    /// A short return is end-of-file, not an error. The requested range is a
    /// hint the backend may ignore; when the response body is the whole
    /// object despite a nonzero offset, the first `offset` bytes of the
    /// stream are discarded before copying.
    pub async fn read(&self, fs_path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        path::validate(fs_path)?;

        if len > self.config.max_read {
            return Err(FsError::ReadTooLarge {
                requested: len,
                limit: self.config.max_read,
            });
        }

        let key = path::strip_root(fs_path);
        let range = offset..offset.saturating_add(len as u64);
        let response = match self.client.get_object(key, Some(range)).await {
            Ok(r) => r,
            Err(e) if e.is_no_such_key() => {
                return Err(FsError::NotFound(fs_path.to_string()));
            }
            Err(e) => return Err(FsError::backend(fs_path, e)),
        };

        // A ranged response starting past byte 0 can never span the whole
        // object, so a full-object body under a nonzero offset means the
        // range was ignored.
        let mut skip = if offset > 0 && response.content_length == response.object_size {
            offset
        } else {
            0
        };

        let mut buf = Vec::with_capacity(len.min(response.content_length as usize));
        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            let mut chunk = chunk.map_err(|e| FsError::backend(fs_path, e))?;
            if skip > 0 {
                if (chunk.len() as u64) <= skip {
                    skip -= chunk.len() as u64;
                    continue;
                }
                chunk = chunk.slice(skip as usize..);
                skip = 0;
            }
            let take = chunk.len().min(len - buf.len());
            buf.extend_from_slice(&chunk[..take]);
            if buf.len() == len {
                break;
            }
        }
        // The stream drops here on every path, releasing the connection.
        Ok(buf)
    }
}
