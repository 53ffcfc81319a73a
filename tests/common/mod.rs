// tests/common/mod.rs
//
// Shared helpers for the integration tests: adapter constructors over the
// in-memory backend and a fault-injecting client wrapper for exercising the
// retry paths.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use objectfs::{
    CompletedPartHandle, FsConfig, ListChunk, MemoryObjectClient, ObjectClient, ObjectFs,
    ObjectStat, Result, StoreError, TagPairs,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Adapter over a fresh in-memory store with default configuration.
pub fn memory_fs() -> (Arc<MemoryObjectClient>, ObjectFs) {
    memory_fs_with(FsConfig::default())
}

pub fn memory_fs_with(config: FsConfig) -> (Arc<MemoryObjectClient>, ObjectFs) {
    init_logging();
    let client = Arc::new(MemoryObjectClient::new());
    let fs = ObjectFs::new(client.clone(), config);
    (client, fs)
}

/// Deterministic payload so corruption shows up as an inequality, not luck.
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Wraps the in-memory client, failing a configured number of range reads
/// and part uploads with transient errors while recording every range
/// requested.
pub struct FaultInjector {
    inner: Arc<MemoryObjectClient>,
    range_failures: AtomicU32,
    part_failures: AtomicU32,
    pub ranges_seen: Mutex<Vec<(u64, u64)>>,
}

impl FaultInjector {
    pub fn new(inner: Arc<MemoryObjectClient>) -> Self {
        Self {
            inner,
            range_failures: AtomicU32::new(0),
            part_failures: AtomicU32::new(0),
            ranges_seen: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `n` range reads with a transient error.
    pub fn fail_range_reads(&self, n: u32) {
        self.range_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` part uploads with a transient error.
    pub fn fail_part_uploads(&self, n: u32) {
        self.part_failures.store(n, Ordering::SeqCst);
    }

    pub fn ranges(&self) -> Vec<(u64, u64)> {
        self.ranges_seen.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ObjectClient for FaultInjector {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        self.inner.put_object(key, body).await
    }

    async fn get_object_metadata(&self, key: &str) -> Result<Option<ObjectStat>> {
        self.inner.get_object_metadata(key).await
    }

    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        self.ranges_seen.lock().unwrap().push((start, end));
        if Self::take_failure(&self.range_failures) {
            return Err(StoreError::transient("injected range-read failure"));
        }
        self.inner.get_object_range(key, start, end).await
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.inner.delete_object(key).await
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        self.inner.delete_objects(keys).await
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: i32,
        continuation: Option<&str>,
    ) -> Result<ListChunk> {
        self.inner
            .list_objects(prefix, delimiter, max_keys, continuation)
            .await
    }

    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<()> {
        self.inner.copy_object(src_key, dst_key).await
    }

    async fn get_object_tags(&self, key: &str) -> Result<Option<TagPairs>> {
        self.inner.get_object_tags(key).await
    }

    async fn set_object_tags(&self, key: &str, tags: TagPairs) -> Result<()> {
        self.inner.set_object_tags(key, tags).await
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        self.inner.create_multipart_upload(key).await
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        if Self::take_failure(&self.part_failures) {
            return Err(StoreError::transient("injected part-upload failure"));
        }
        self.inner.upload_part(key, upload_id, part_number, body).await
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartHandle],
    ) -> Result<()> {
        self.inner.complete_multipart_upload(key, upload_id, parts).await
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        self.inner.abort_multipart_upload(key, upload_id).await
    }
}
