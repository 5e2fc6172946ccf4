//! Process-wide mount registry.
//!
//! The single source of truth for "is X mounted". One entry per bucket
//! identity and one per mountpoint, enforced atomically: the registry lock
//! is held across the duplicate checks and the attachment, so concurrent
//! callers cannot race a double mount past them. The registry is an
//! injected service constructed once at startup, not ambient static state.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use client::ObjectClient;

use crate::fs::{BucketFs, FsConfig};

/// The (account, bucket) pair identifying one logical mount target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountIdentity {
    pub access_id: String,
    pub bucket: String,
}

impl fmt::Display for MountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.access_id, self.bucket)
    }
}

/// A snapshot of one active mount.
#[derive(Debug, Clone)]
pub struct MountInfo {
    pub identity: MountIdentity,
    pub mountpoint: PathBuf,
}

/// Attaches a filesystem instance to an OS mount point.
///
/// The production implementation spawns a background fuser session; tests
/// substitute a fake so registry semantics can be exercised without a
/// kernel.
pub trait MountBackend: Send + Sync {
    type Session: Send;

    fn attach(
        &self,
        fs: Arc<BucketFs>,
        mountpoint: &Path,
        volume: &str,
    ) -> Result<Self::Session, RegistryError>;
}

struct MountEntry<S> {
    mountpoint: PathBuf,
    // Kept alive for the duration of the mount; dropping the entry releases
    // the backend handle and the session (which unmounts).
    _fs: Arc<BucketFs>,
    _session: S,
}

/// Registry of active mounts. All operations are linearizable: they execute
/// under one mutex across the whole registry.
pub struct MountRegistry<B: MountBackend> {
    backend: B,
    mounts: Mutex<HashMap<MountIdentity, MountEntry<B::Session>>>,
}

impl<B: MountBackend> MountRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            mounts: Mutex::new(HashMap::new()),
        }
    }

    /// Mount `identity` at `mountpoint` with a fresh filesystem instance
    /// (empty caches) over `client`.
    ///
    /// Fails fast on a duplicate identity or an occupied mountpoint before
    /// touching the backend; a failed attachment leaves no entry behind.
    pub fn mount(
        &self,
        identity: MountIdentity,
        object_client: Arc<dyn ObjectClient>,
        mountpoint: &Path,
        config: FsConfig,
    ) -> Result<(), RegistryError> {
        let mut mounts = self.mounts.lock();

        if mounts.contains_key(&identity) {
            return Err(RegistryError::AlreadyMounted(identity));
        }
        if let Some((existing, _)) = mounts.iter().find(|(_, e)| e.mountpoint == mountpoint) {
            return Err(RegistryError::MountpointInUse {
                mountpoint: mountpoint.to_path_buf(),
                identity: existing.clone(),
            });
        }

        let fs = Arc::new(BucketFs::new(object_client, config));
        let session = self.backend.attach(fs.clone(), mountpoint, &identity.bucket)?;

        tracing::info!(%identity, mountpoint = %mountpoint.display(), "mounted bucket");

        mounts.insert(
            identity,
            MountEntry {
                mountpoint: mountpoint.to_path_buf(),
                _fs: fs,
                _session: session,
            },
        );

        Ok(())
    }

    /// Unmount by mountpoint path, full identity (`access_id/bucket`), or
    /// bare bucket name. Returns false — not an error — when nothing
    /// matches.
    pub fn unmount(&self, target: &str) -> bool {
        let mut mounts = self.mounts.lock();

        let matched = mounts.iter().find_map(|(identity, entry)| {
            let hit = entry.mountpoint == Path::new(target)
                || identity.to_string() == target
                || identity.bucket == target;
            hit.then(|| identity.clone())
        });

        match matched {
            Some(identity) => {
                let entry = mounts.remove(&identity);
                if let Some(entry) = entry {
                    tracing::info!(%identity, mountpoint = %entry.mountpoint.display(), "unmounted bucket");
                }
                true
            }
            None => {
                tracing::debug!(target, "no mount matched");
                false
            }
        }
    }

    /// Snapshot of the active mounts.
    pub fn list(&self) -> Vec<MountInfo> {
        self.mounts
            .lock()
            .iter()
            .map(|(identity, entry)| MountInfo {
                identity: identity.clone(),
                mountpoint: entry.mountpoint.clone(),
            })
            .collect()
    }

    /// Tear down every active mount.
    pub fn unmount_all(&self) {
        let mut mounts = self.mounts.lock();
        for (identity, entry) in mounts.drain() {
            tracing::info!(%identity, mountpoint = %entry.mountpoint.display(), "unmounted bucket");
        }
    }
}

/// Errors raised by mount/unmount operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} is already mounted")]
    AlreadyMounted(MountIdentity),

    #[error("mountpoint {} is already used by {identity}", mountpoint.display())]
    MountpointInUse {
        mountpoint: PathBuf,
        identity: MountIdentity,
    },

    #[error("mountpoint {} is not usable: {reason}", mountpoint.display())]
    MountpointUnusable { mountpoint: PathBuf, reason: String },

    #[error("failed to attach filesystem at {}: {reason}", mountpoint.display())]
    AttachFailed { mountpoint: PathBuf, reason: String },
}
