// Core translation layer
pub mod error;
pub mod fs;

// Kernel-callback plumbing (FUSE adapter)
pub mod fuse;

// Process-wide mount table
pub mod registry;

// Front end (CLI args, credentials, interactive console)
pub mod cli;
pub mod config;
pub mod console;

// Re-exports for consumers
pub use error::FsError;
pub use fs::{Attr, BucketFs, DirEntry, FsConfig};
pub use registry::{MountBackend, MountIdentity, MountInfo, MountRegistry, RegistryError};
