// src/client.rs
//
//! Abstract object-store capability the adapter is built on.
//!
//! One concrete type per backing store implements [`ObjectClient`]; the
//! adapter composes the shared path/listing/retry/tag logic on top instead
//! of knowing any vendor SDK. See `s3_store` for the network backend and
//! `memory_store` for the hermetic one.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Immutable snapshot of one object's metadata at listing/stat time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    /// Opaque content fingerprint; not every store returns one.
    pub e_tag: Option<String>,
    pub size: u64,
    pub last_modified_ms: Option<i64>,
}

/// One raw page of a listing response.
#[derive(Debug, Clone, Default)]
pub struct ListChunk {
    pub objects: Vec<ObjectStat>,
    /// Virtual subdirectory groupings produced by a non-empty delimiter.
    pub common_prefixes: Vec<String>,
    /// Opaque token resuming the listing after this page, if any.
    pub continuation: Option<String>,
    pub is_truncated: bool,
}

impl ListChunk {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.common_prefixes.is_empty()
    }
}

/// One committed part of a multipart upload. The store reassembles parts by
/// number, never by completion order.
#[derive(Debug, Clone)]
pub struct CompletedPartHandle {
    pub part_number: i32,
    pub e_tag: String,
}

/// Tag name/value pairs as the store transports them. Order-preserving so
/// the tag merge can be a linear scan; names are unique.
pub type TagPairs = Vec<(String, String)>;

/// Single-object primitives of the backing store. All methods translate
/// store failures into [`crate::StoreError`] kinds; none of them retries
/// internally.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// PUT one complete object. Content length is `body.len()`.
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()>;

    /// HEAD-like metadata fetch; `None` when the object does not exist.
    async fn get_object_metadata(&self, key: &str) -> Result<Option<ObjectStat>>;

    /// Ranged GET of the inclusive byte range `[start, end]`. Returns the
    /// bytes actually available: short when the object ends inside the
    /// range, empty when `start` is at or past the end.
    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes>;

    /// DELETE one key. Deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> Result<()>;

    /// Batch DELETE of at most the store's per-request limit. Returns the
    /// subset of `keys` the store confirmed deleted; per-key failures are
    /// reflected by omission, not by error.
    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>>;

    /// One page of a prefix listing. An empty `delimiter` disables common
    /// prefix grouping (recursive listing).
    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: i32,
        continuation: Option<&str>,
    ) -> Result<ListChunk>;

    /// Server-side single-object copy within the bucket.
    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<()>;

    /// Current tag set of one object; `None` when the object is absent.
    async fn get_object_tags(&self, key: &str) -> Result<Option<TagPairs>>;

    /// Replace the full tag set of one object.
    async fn set_object_tags(&self, key: &str, tags: TagPairs) -> Result<()>;

    /// Start a multipart upload session, returning its opaque upload id.
    async fn create_multipart_upload(&self, key: &str) -> Result<String>;

    /// Upload one part; returns the part's entity tag.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;

    /// Commit the session from `(part_number, e_tag)` pairs in ascending
    /// part-number order.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartHandle],
    ) -> Result<()>;

    /// Abort the session, releasing server-side part state.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()>;
}
