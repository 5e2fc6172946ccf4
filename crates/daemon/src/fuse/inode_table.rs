//! Inode to path mapping.
//!
//! The kernel identifies files by inode (u64); the translation core works
//! on rooted string paths. Entries are only ever added — the view is
//! read-only, so a path's inode stays stable for the life of the mount.

use std::collections::HashMap;

/// Bidirectional mapping between inodes and rooted paths.
pub struct InodeTable {
    path_to_inode: HashMap<String, u64>,
    inode_to_path: HashMap<u64, String>,
    next_inode: u64,
}

impl InodeTable {
    /// The root directory is always inode 1.
    pub const ROOT_INODE: u64 = 1;

    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_path: HashMap::new(),
            next_inode: 2,
        };

        table.path_to_inode.insert("/".to_string(), Self::ROOT_INODE);
        table.inode_to_path.insert(Self::ROOT_INODE, "/".to_string());

        table
    }

    /// Get the inode for a path, allocating one if it doesn't exist.
    pub fn get_or_create(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.path_to_inode.get(path) {
            return ino;
        }

        let ino = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.to_string(), ino);
        self.inode_to_path.insert(ino, path.to_string());
        ino
    }

    /// Get the path for an inode, if known.
    pub fn get_path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(|p| p.as_str())
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_inode_one() {
        let table = InodeTable::new();
        assert_eq!(table.get_path(InodeTable::ROOT_INODE), Some("/"));
    }

    #[test]
    fn inodes_are_stable() {
        let mut table = InodeTable::new();

        let a = table.get_or_create("/docs/a.txt");
        let b = table.get_or_create("/docs/b.txt");
        assert_ne!(a, b);
        assert_eq!(table.get_or_create("/docs/a.txt"), a);
        assert_eq!(table.get_path(a), Some("/docs/a.txt"));
        assert_eq!(table.get_path(999), None);
    }
}
