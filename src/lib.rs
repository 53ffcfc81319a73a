// src/lib.rs
//
// Crate root - module declarations plus public re-exports.
//
// objectfs adapts a flat, key-based object store (bucket + key, no native
// directories) to a hierarchical filesystem abstraction: paths, directory
// emulation, paginated listing, retrying streamed reads, single-shot and
// multipart writes, chunked batch delete, rename via copy, and tag merging.

// ===== Core building blocks =====
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
pub mod retry;

// ===== Adapter components =====
pub mod fs;
pub mod listing;
pub mod reader;
pub mod writer;

// ===== Backends =====
pub mod memory_store;
pub mod s3_store;

// ===== Re-exports =====
pub use client::{CompletedPartHandle, ListChunk, ObjectClient, ObjectStat, TagPairs};
pub use config::FsConfig;
pub use error::{Result, StoreError};
pub use fs::{ObjectFs, ObjectPermissions};
pub use listing::ListingChunk;
pub use memory_store::MemoryObjectClient;
pub use paths::KeyMapper;
pub use reader::{ObjectReader, PositionReader};
pub use retry::{ExponentialBackoff, RetryPolicy, retry_transient};
pub use s3_store::S3ObjectClient;
pub use writer::{MultipartWriter, ObjectWriter, SingleShotWriter};
