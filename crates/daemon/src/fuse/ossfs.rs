//! FUSE adapter for a bucket filesystem.
//!
//! Implements the fuser::Filesystem trait by bridging each synchronous
//! kernel callback onto the async translation core with a runtime handle.
//! The view is strictly read-only: every mutating callback answers EROFS.

use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, Request,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::error::FsError;
use crate::fs::{path, Attr, BucketFs};
use crate::fuse::inode_table::InodeTable;

/// FUSE filesystem over one mounted bucket.
pub struct OssFuse {
    /// Tokio runtime handle for async backend calls
    rt: Handle,
    /// The translation core
    fs: Arc<BucketFs>,
    /// Inode table
    inodes: RwLock<InodeTable>,
    /// Next file handle
    next_fh: AtomicU64,
}

impl OssFuse {
    /// TTL the kernel may cache attributes for
    const ATTR_TTL: Duration = Duration::from_secs(1);

    /// Block size reported in attributes
    const BLOCK_SIZE: u32 = 512;

    pub fn new(rt: Handle, fs: Arc<BucketFs>) -> Self {
        Self {
            rt,
            fs,
            inodes: RwLock::new(InodeTable::new()),
            next_fh: AtomicU64::new(1),
        }
    }

    fn next_handle(&self) -> u64 {
        self.next_fh.fetch_add(1, Ordering::SeqCst)
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.inodes.read().get_path(ino).map(str::to_string)
    }

    /// Map a translation-layer error onto the host's error codes.
    fn errno(&self, path: &str, err: &FsError) -> libc::c_int {
        match err {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::ReadTooLarge { .. } => {
                tracing::warn!(path, %err, "rejecting oversized read");
                libc::EIO
            }
            FsError::Backend { .. } => {
                tracing::error!(path, %err, "backend fault");
                libc::EIO
            }
        }
    }

    fn make_attr(&self, inode: u64, attr: &Attr) -> FileAttr {
        let (kind, perm, size, mtime) = match attr {
            Attr::File { size, mtime } => (FileType::RegularFile, 0o444, *size, Some(*mtime)),
            Attr::Directory { mtime } => (FileType::Directory, 0o555, 0, *mtime),
        };

        let mtime = mtime
            .map(|t| UNIX_EPOCH + Duration::from_secs(t.timestamp().max(0) as u64))
            .unwrap_or_else(|| {
                // Directories known only via listing get the mount epoch.
                UNIX_EPOCH
                    + Duration::from_secs(self.fs.started_at().timestamp().max(0) as u64)
            });

        FileAttr {
            ino: inode,
            size,
            blocks: size.div_ceil(Self::BLOCK_SIZE as u64),
            atime: mtime,
            mtime,
            ctime: mtime,
            crtime: mtime,
            kind,
            perm,
            nlink: 1,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            rdev: 0,
            blksize: Self::BLOCK_SIZE,
            flags: 0,
        }
    }
}

impl Filesystem for OssFuse {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!("FUSE filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name.to_str() {
            Some(n) => n,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let parent_path = match self.path_of(parent) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let child_path = path::join(&parent_path, name);

        match self.rt.block_on(self.fs.resolve(&child_path)) {
            Ok(attr) => {
                let inode = self.inodes.write().get_or_create(&child_path);
                let file_attr = self.make_attr(inode, &attr);
                reply.entry(&Self::ATTR_TTL, &file_attr, 0);
            }
            Err(e) => reply.error(self.errno(&child_path, &e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let fs_path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self.rt.block_on(self.fs.resolve(&fs_path)) {
            Ok(attr) => {
                let file_attr = self.make_attr(ino, &attr);
                reply.attr(&Self::ATTR_TTL, &file_attr);
            }
            Err(e) => reply.error(self.errno(&fs_path, &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let fs_path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let entries = match self.rt.block_on(self.fs.list_collected(&fs_path)) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(self.errno(&fs_path, &e));
                return;
            }
        };

        let mut all_entries: Vec<(u64, FileType, String)> = Vec::with_capacity(entries.len() + 2);

        all_entries.push((ino, FileType::Directory, ".".to_string()));
        let parent_ino = if ino == InodeTable::ROOT_INODE {
            ino
        } else {
            self.inodes.write().get_or_create(path::parent(&fs_path))
        };
        all_entries.push((parent_ino, FileType::Directory, "..".to_string()));

        for entry in entries {
            let child_path = path::join(&fs_path, &entry.name);
            let child_ino = self.inodes.write().get_or_create(&child_path);
            let kind = if entry.is_dir {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            all_entries.push((child_ino, kind, entry.name));
        }

        for (i, (ino, kind, name)) in all_entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }

        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let fs_path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        let write_flags = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_TRUNC;
        if flags & write_flags != 0 {
            reply.error(libc::EROFS);
            return;
        }

        match self.rt.block_on(self.fs.resolve(&fs_path)) {
            Ok(_) => reply.opened(self.next_handle(), 0),
            Err(e) => reply.error(self.errno(&fs_path, &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let fs_path = match self.path_of(ino) {
            Some(p) => p,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match self
            .rt
            .block_on(self.fs.read(&fs_path, offset as u64, size as usize))
        {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(self.errno(&fs_path, &e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    // The view is read-only; every mutating callback answers EROFS.

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<fuser::TimeOrNow>,
        _mtime: Option<fuser::TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        reply.error(libc::EROFS);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }
}
