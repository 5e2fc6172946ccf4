//! Negative and positive path caches.
//!
//! Uses moka for the TTL-bounded negative cache (lazy expiry, no eviction
//! thread). The known-directory set is grow-only and lives until the
//! filesystem instance is dropped; it may over-approximate, since listing
//! is idempotent and a stale member only costs one correct extra `Directory`
//! answer within the consistency window the backend already allows.
//!
//! Both structures key on the full rooted path without a trailing slash
//! (e.g. `/docs/sub`). Mixing key forms would produce entries that never
//! match, so the stripped form never appears here.

use std::collections::HashSet;
use std::time::Duration;

use moka::sync::Cache;
use parking_lot::RwLock;

const NEGATIVE_CACHE_CAPACITY: u64 = 100_000;

/// Per-mount memory of "this path is absent" and "this path is a directory".
///
/// Best-effort accelerators only: a lost update costs a redundant round
/// trip, never a wrong answer.
pub struct PathCaches {
    negative: Cache<String, ()>,
    known_dirs: RwLock<HashSet<String>>,
}

impl PathCaches {
    pub fn new(negative_ttl: Duration) -> Self {
        Self {
            negative: Cache::builder()
                .max_capacity(NEGATIVE_CACHE_CAPACITY)
                .time_to_live(negative_ttl)
                .build(),
            known_dirs: RwLock::new(HashSet::new()),
        }
    }

    /// Record that a probe for `path` came back not-found.
    pub fn note_missing(&self, path: &str) {
        self.negative.insert(path.to_string(), ());
    }

    /// Whether `path` was confirmed absent within the expiry window.
    pub fn is_missing(&self, path: &str) -> bool {
        self.negative.get(path).is_some()
    }

    /// Drop a negative entry; called the moment a listing surfaces `path`.
    pub fn forget_missing(&self, path: &str) {
        self.negative.invalidate(path);
    }

    /// Record that `path` was observed as a directory.
    pub fn note_directory(&self, path: &str) {
        self.known_dirs.write().insert(path.to_string());
    }

    /// Whether a prior listing already proved `path` is a directory.
    pub fn is_known_directory(&self, path: &str) -> bool {
        self.known_dirs.read().contains(path)
    }
}
