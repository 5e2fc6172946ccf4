//! Object-storage client boundary for ossfs.
//!
//! The daemon's translation layer talks to the backing store exclusively
//! through the [`ObjectClient`] trait: a metadata probe, a ranged content
//! fetch, and a delimiter-bounded listing. Two implementations live here:
//!
//! - [`S3Client`] — production client for S3-compatible endpoints
//!   (Aliyun OSS, AWS S3, MinIO), built on the `object_store` crate.
//! - [`MemoryClient`] — in-memory backend with full wire-contract fidelity
//!   (directory markers, marker-based pagination, an optional
//!   range-ignoring mode) plus per-operation call counters and fault
//!   injection for tests.

mod api;
mod error;
mod memory;
mod s3;
mod types;

pub use api::ObjectClient;
pub use error::{ClientError, Result};
pub use memory::{CallCounts, MemoryClient};
pub use s3::{S3Client, S3Config};
pub use types::{GetResponse, ListingPage, ObjectMeta};
