//! Kernel-callback plumbing: the fuser adapter and the backend that spawns
//! mounted sessions for the registry.

mod inode_table;
mod ossfs;

pub use inode_table::InodeTable;
pub use ossfs::OssFuse;

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::fs::BucketFs;
use crate::registry::{MountBackend, RegistryError};

/// Production [`MountBackend`]: attaches a [`BucketFs`] to the OS mount
/// point through a background fuser session. Dropping the session unmounts.
pub struct FuseBackend {
    rt: Handle,
}

impl FuseBackend {
    pub fn new(rt: Handle) -> Self {
        Self { rt }
    }
}

impl MountBackend for FuseBackend {
    type Session = fuser::BackgroundSession;

    fn attach(
        &self,
        fs: Arc<BucketFs>,
        mountpoint: &Path,
        volume: &str,
    ) -> Result<Self::Session, RegistryError> {
        if !mountpoint.exists() {
            std::fs::create_dir_all(mountpoint).map_err(|e| RegistryError::MountpointUnusable {
                mountpoint: mountpoint.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        if !mountpoint.is_dir() {
            return Err(RegistryError::MountpointUnusable {
                mountpoint: mountpoint.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let fuse_fs = OssFuse::new(self.rt.clone(), fs);

        #[cfg(target_os = "linux")]
        let options = vec![
            fuser::MountOption::FSName("ossfs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::AutoUnmount,
        ];

        #[cfg(target_os = "macos")]
        let options = vec![
            fuser::MountOption::FSName("ossfs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::AutoUnmount,
            fuser::MountOption::CUSTOM(format!("volname={volume}")),
            fuser::MountOption::CUSTOM("local".to_string()),
            fuser::MountOption::CUSTOM("noappledouble".to_string()),
        ];

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        let options = vec![
            fuser::MountOption::FSName("ossfs".to_string()),
            fuser::MountOption::RO,
        ];

        #[cfg(not(target_os = "macos"))]
        let _ = volume;

        fuser::spawn_mount2(fuse_fs, mountpoint, &options).map_err(|e| {
            RegistryError::AttachFailed {
                mountpoint: mountpoint.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }
}
