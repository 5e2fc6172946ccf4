//! Helpers for the slash-separated paths the kernel hands us.

use crate::error::FsError;

/// Paths must be rooted at `/`.
pub fn validate(path: &str) -> Result<(), FsError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(FsError::InvalidPath(path.to_string()))
    }
}

/// The object key for a path: the leading slash stripped.
pub fn strip_root(path: &str) -> &str {
    &path[1..]
}

/// Final component of a path (`"/docs/readme.txt"` → `"readme.txt"`).
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a path; the root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Join a child name onto a directory path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}
