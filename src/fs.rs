// src/fs.rs
//
//! The filesystem adapter.
//!
//! `ObjectFs` exposes hierarchical filesystem operations over the flat
//! single-object primitives of an [`ObjectClient`]: directory emulation via
//! folder markers and listing probes, streaming readers/writers, chunked
//! batch delete, rename via copy + delete, and tag read-modify-write.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;

use crate::client::{ObjectClient, ObjectStat, TagPairs};
use crate::config::FsConfig;
use crate::constants::{DEFAULT_OBJECT_MODE, MAX_BATCH_DELETE_KEYS, PATH_SEPARATOR};
use crate::error::{Result, StoreError};
use crate::listing::ListingChunk;
use crate::paths::KeyMapper;
use crate::reader::{ObjectReader, PositionReader};
use crate::retry::{ExponentialBackoff, RetryPolicy};
use crate::writer::{MultipartWriter, ObjectWriter, SingleShotWriter};

/// Fixed permissions value reported for every object. The underlying store
/// has no ACL model to integrate with, so this capability is a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPermissions {
    pub owner: String,
    pub group: String,
    pub mode: u32,
}

impl Default for ObjectPermissions {
    fn default() -> Self {
        Self {
            owner: String::new(),
            group: String::new(),
            mode: DEFAULT_OBJECT_MODE,
        }
    }
}

/// Hierarchical filesystem view over one bucket of a flat object store.
pub struct ObjectFs {
    client: Arc<dyn ObjectClient>,
    config: FsConfig,
    mapper: KeyMapper,
    retry: Arc<dyn RetryPolicy>,
    // Shared pool bounding concurrent part uploads; created on first
    // multipart use, never resized, lives as long as the adapter.
    part_upload_slots: OnceCell<Arc<Semaphore>>,
}

impl ObjectFs {
    pub fn new(client: Arc<dyn ObjectClient>, config: FsConfig) -> Self {
        let mapper = KeyMapper::new(&config.root_prefix);
        let retry: Arc<dyn RetryPolicy> = Arc::new(ExponentialBackoff::new(
            config.retry_attempts,
            config.retry_base_delay,
        ));
        Self {
            client,
            config,
            mapper,
            retry,
            part_upload_slots: OnceCell::new(),
        }
    }

    /// Replace the default backoff policy with an injected one.
    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn mapper(&self) -> &KeyMapper {
        &self.mapper
    }

    /// Key the filesystem root maps to (the configured prefix, maybe empty).
    pub fn root_key(&self) -> &str {
        self.mapper.root_key()
    }

    fn part_upload_slots(&self) -> Arc<Semaphore> {
        self.part_upload_slots
            .get_or_init(|| {
                let slots = self
                    .config
                    .multipart_upload_threads
                    .min(self.config.max_connections)
                    .max(1);
                Arc::new(Semaphore::new(slots))
            })
            .clone()
    }

    // --- directory emulation -------------------------------------------------

    /// A path is a directory if it is the root, a folder marker exists for
    /// it, or anything at all lives under its prefix. Virtual directories
    /// (prefix only, no marker) count.
    pub async fn is_directory(&self, path: &str) -> Result<bool> {
        if self.mapper.is_root(path) {
            return Ok(true);
        }
        let folder_key = self.mapper.to_folder_key(path);
        if self.client.get_object_metadata(&folder_key).await?.is_some() {
            return Ok(true);
        }
        Ok(self.list_chunk(path, true).await?.is_some())
    }

    /// Materialize an explicit empty directory as a folder-marker object.
    /// Returns false (with a logged error) when the marker PUT fails.
    pub async fn create_directory(&self, path: &str) -> bool {
        let folder_key = self.mapper.to_folder_key(path);
        if folder_key.is_empty() {
            // Root always exists; nothing to materialize.
            return true;
        }
        self.create_empty_object(&folder_key).await
    }

    /// PUT a zero-length object at `key`.
    pub async fn create_empty_object(&self, key: &str) -> bool {
        match self.client.put_object(key, Bytes::new()).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to create object {key}: {e}");
                false
            }
        }
    }

    // --- stat ----------------------------------------------------------------

    /// Metadata snapshot for the object at `path`, `None` when absent.
    pub async fn object_status(&self, path: &str) -> Result<Option<ObjectStat>> {
        let key = self.mapper.to_key(path);
        self.client.get_object_metadata(&key).await
    }

    /// True when `path` exists as a file or a directory.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        if self.object_status(path).await?.is_some() {
            return Ok(true);
        }
        self.is_directory(path).await
    }

    // --- listing -------------------------------------------------------------

    /// First listing page under `path`, or `None` when nothing lives there.
    /// Non-recursive listings group children behind the path separator into
    /// common prefixes, which behave like subdirectories.
    pub async fn list_chunk(&self, path: &str, recursive: bool) -> Result<Option<ListingChunk>> {
        let prefix = self.mapper.to_list_prefix(path);
        let delimiter = if recursive { "" } else { PATH_SEPARATOR };
        let chunk = ListingChunk::first(
            self.client.clone(),
            prefix,
            delimiter.to_string(),
            self.config.listing_page_size,
        )
        .await?;
        if chunk.is_empty() {
            return Ok(None);
        }
        Ok(Some(chunk))
    }

    // --- reads ---------------------------------------------------------------

    /// Open a seekable, retrying byte stream over the object at `path`,
    /// starting at `offset`.
    pub fn open_object(&self, path: &str, offset: u64) -> ObjectReader {
        ObjectReader::new(
            self.client.clone(),
            self.mapper.to_key(path),
            offset,
            self.config.read_chunk_size,
            self.retry.clone(),
        )
    }

    /// Positional reader for concurrent random access without cursor state.
    pub fn open_position_read(&self, path: &str, file_len: u64) -> PositionReader {
        PositionReader::new(
            self.client.clone(),
            self.mapper.to_key(path),
            file_len,
            self.config.read_chunk_size,
            self.retry.clone(),
        )
    }

    // --- writes --------------------------------------------------------------

    /// Output sink for a new object at `path`: multipart when enabled in
    /// configuration, single-shot otherwise.
    pub async fn create_object(&self, path: &str) -> Result<ObjectWriter> {
        let key = self.mapper.to_key(path);
        if self.config.multipart_enabled {
            let writer = MultipartWriter::open(
                self.client.clone(),
                key,
                self.config.part_size,
                self.part_upload_slots(),
                self.retry.clone(),
            )
            .await?;
            Ok(ObjectWriter::Multipart(writer))
        } else {
            Ok(ObjectWriter::Single(SingleShotWriter::new(
                self.client.clone(),
                key,
                self.config.tmp_dirs.clone(),
                self.config.spill_threshold,
                self.retry.clone(),
            )))
        }
    }

    // --- delete / copy / rename ---------------------------------------------

    /// Delete the object at `path`. Deleting an absent object succeeds;
    /// store errors are logged and reported as false.
    pub async fn delete_object(&self, path: &str) -> bool {
        let key = self.mapper.to_key(path);
        match self.client.delete_object(&key).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to delete {key}: {e}");
                false
            }
        }
    }

    /// Batch-delete store keys (as produced by listing), chunked to the
    /// store's per-request limit. Returns the union of keys confirmed
    /// deleted; a chunk-level transport failure fails the whole call with no
    /// partial result.
    pub async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut deleted = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MAX_BATCH_DELETE_KEYS) {
            let confirmed = self.client.delete_objects(chunk).await?;
            deleted.extend(confirmed);
        }
        Ok(deleted)
    }

    /// Server-side copy of one object. Logged-false on failure.
    pub async fn copy_object(&self, src: &str, dst: &str) -> bool {
        let src_key = self.mapper.to_key(src);
        let dst_key = self.mapper.to_key(dst);
        log::debug!("copying {src_key} to {dst_key}");
        match self.client.copy_object(&src_key, &dst_key).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to copy {src_key} to {dst_key}: {e}");
                false
            }
        }
    }

    /// Rename is copy + delete of the source; not atomic. A crash between
    /// the two calls leaves both keys present, which callers must tolerate.
    pub async fn rename_object(&self, src: &str, dst: &str) -> bool {
        if !self.copy_object(src, dst).await {
            return false;
        }
        self.delete_object(src).await
    }

    // --- tags ----------------------------------------------------------------

    /// Merge one tag into the object's tag set: fetch, replace in place or
    /// append, write the full set back.
    ///
    /// This is a read-and-update race. Under concurrent writers the merged
    /// snapshot may already be stale when the write lands; the store's own
    /// arbitration (last PUT wins) determines the final result.
    pub async fn set_tag(&self, path: &str, name: &str, value: &str) -> Result<()> {
        let key = self.mapper.to_key(path);
        let mut tags: TagPairs = self
            .client
            .get_object_tags(&key)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut matched = false;
        for tag in tags.iter_mut() {
            if tag.0 == name {
                tag.1 = value.to_string();
                matched = true;
            }
        }
        if !matched {
            tags.push((name.to_string(), value.to_string()));
        }
        self.client.set_object_tags(&key, tags).await
    }

    /// Tag set of the object at `path`; `None` when the object is absent.
    pub async fn get_tags(&self, path: &str) -> Result<Option<HashMap<String, String>>> {
        let key = self.mapper.to_key(path);
        let tags = self.client.get_object_tags(&key).await?;
        Ok(tags.map(|pairs| pairs.into_iter().collect()))
    }

    // --- permissions (not supported by the store) ----------------------------

    /// No ACL integration; never fails.
    pub fn set_owner(&self, _path: &str, _user: &str, _group: &str) {}

    /// No ACL integration; never fails.
    pub fn set_mode(&self, _path: &str, _mode: u32) {}

    /// Fixed default permissions for every object.
    pub fn permissions(&self) -> ObjectPermissions {
        ObjectPermissions::default()
    }
}
