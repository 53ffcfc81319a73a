// src/memory_store.rs
//
//! In-memory `ObjectClient` backend.
//!
//! Keeps a whole bucket in a `BTreeMap` so listings come back in the
//! lexicographic key order real stores use. Implements the full capability
//! surface, including marker-based pagination, delimiter grouping and
//! multipart sessions, so the adapter can be exercised without a network.
//! Used by the integration tests and handy for local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;

use crate::client::{CompletedPartHandle, ListChunk, ObjectClient, ObjectStat, TagPairs};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    e_tag: String,
    last_modified_ms: i64,
    tags: TagPairs,
}

#[derive(Debug, Default)]
struct UploadSession {
    key: String,
    // part number -> (entity tag, bytes)
    parts: HashMap<i32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<String, StoredObject>,
    uploads: HashMap<String, UploadSession>,
    counter: u64,
}

impl MemoryState {
    fn next_tag(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}-{}", self.counter)
    }
}

/// Whole-bucket in-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    state: Mutex<MemoryState>,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects; test observability.
    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Number of multipart sessions that were started but neither completed
    /// nor aborted; test observability.
    pub fn active_upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(key)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn stat_of(key: &str, obj: &StoredObject) -> ObjectStat {
    ObjectStat {
        key: key.to_string(),
        e_tag: Some(obj.e_tag.clone()),
        size: obj.data.len() as u64,
        last_modified_ms: Some(obj.last_modified_ms),
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let e_tag = state.next_tag("etag");
        state.objects.insert(
            key.to_string(),
            StoredObject {
                data: body,
                e_tag,
                last_modified_ms: now_ms(),
                tags: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_object_metadata(&self, key: &str) -> Result<Option<ObjectStat>> {
        let state = self.state.lock().unwrap();
        Ok(state.objects.get(key).map(|obj| stat_of(key, obj)))
    }

    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        let obj = state.objects.get(key).ok_or(StoreError::NotFound)?;
        let len = obj.data.len() as u64;
        if start >= len {
            return Ok(Bytes::new());
        }
        let end = end.min(len - 1);
        Ok(obj.data.slice(start as usize..=end as usize))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        // Deleting an absent key succeeds, as in real stores.
        self.state.lock().unwrap().objects.remove(key);
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        let mut deleted = Vec::new();
        for key in keys {
            if state.objects.remove(key).is_some() {
                deleted.push(key.clone());
            }
        }
        Ok(deleted)
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: i32,
        continuation: Option<&str>,
    ) -> Result<ListChunk> {
        let state = self.state.lock().unwrap();
        let max = max_keys.max(1) as usize;
        let mut objects = Vec::new();
        let mut common_prefixes: Vec<String> = Vec::new();
        let mut last_consumed: Option<String> = None;
        let mut is_truncated = false;

        for (key, obj) in state.objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(marker) = continuation {
                if key.as_str() <= marker {
                    continue;
                }
            }

            // Delimiter grouping: keys under an already-emitted common
            // prefix are consumed without counting, so a page boundary
            // never splits a group across pages.
            if !delimiter.is_empty() {
                let rest = &key[prefix.len()..];
                if let Some(idx) = rest.find(delimiter) {
                    let group = key[..prefix.len() + idx + delimiter.len()].to_string();
                    if common_prefixes.last() == Some(&group) {
                        last_consumed = Some(key.clone());
                        continue;
                    }
                    if objects.len() + common_prefixes.len() >= max {
                        is_truncated = true;
                        break;
                    }
                    common_prefixes.push(group);
                    last_consumed = Some(key.clone());
                    continue;
                }
            }

            if objects.len() + common_prefixes.len() >= max {
                is_truncated = true;
                break;
            }
            objects.push(stat_of(key, obj));
            last_consumed = Some(key.clone());
        }

        Ok(ListChunk {
            objects,
            common_prefixes,
            continuation: if is_truncated { last_consumed } else { None },
            is_truncated,
        })
    }

    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let src = state.objects.get(src_key).ok_or(StoreError::NotFound)?.clone();
        let e_tag = state.next_tag("etag");
        state.objects.insert(
            dst_key.to_string(),
            StoredObject {
                data: src.data,
                e_tag,
                last_modified_ms: now_ms(),
                tags: src.tags,
            },
        );
        Ok(())
    }

    async fn get_object_tags(&self, key: &str) -> Result<Option<TagPairs>> {
        let state = self.state.lock().unwrap();
        Ok(state.objects.get(key).map(|obj| obj.tags.clone()))
    }

    async fn set_object_tags(&self, key: &str, tags: TagPairs) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let obj = state.objects.get_mut(key).ok_or(StoreError::NotFound)?;
        obj.tags = tags;
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let upload_id = state.next_tag("upload");
        state.uploads.insert(
            upload_id.clone(),
            UploadSession {
                key: key.to_string(),
                parts: HashMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let e_tag = state.next_tag("part");
        let session = state.uploads.get_mut(upload_id).ok_or(StoreError::NotFound)?;
        if session.key != key {
            return Err(StoreError::permanent(
                "NoSuchUpload",
                format!("upload {upload_id} does not belong to key {key}"),
            ));
        }
        session.parts.insert(part_number, (e_tag.clone(), body));
        Ok(e_tag)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartHandle],
    ) -> Result<()> {
        if parts.is_empty() {
            // Real stores refuse a zero-part completion.
            return Err(StoreError::permanent(
                "InvalidRequest",
                "You must specify at least one part",
            ));
        }
        let mut state = self.state.lock().unwrap();
        let session = state.uploads.remove(upload_id).ok_or(StoreError::NotFound)?;
        if session.key != key {
            return Err(StoreError::permanent(
                "NoSuchUpload",
                format!("upload {upload_id} does not belong to key {key}"),
            ));
        }

        // Reassemble by part number regardless of the order parts finished
        // uploading in. The caller must list them ascending.
        let mut handles: Vec<&CompletedPartHandle> = parts.iter().collect();
        handles.sort_by_key(|p| p.part_number);
        let mut assembled = Vec::new();
        for handle in handles {
            let (e_tag, data) = session.parts.get(&handle.part_number).ok_or_else(|| {
                StoreError::permanent(
                    "InvalidPart",
                    format!("part {} was never uploaded", handle.part_number),
                )
            })?;
            if *e_tag != handle.e_tag {
                return Err(StoreError::permanent(
                    "InvalidPart",
                    format!("part {} entity tag mismatch", handle.part_number),
                ));
            }
            assembled.extend_from_slice(data);
        }

        let e_tag = state.next_tag("etag");
        state.objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::from(assembled),
                e_tag,
                last_modified_ms: now_ms(),
                tags: Vec::new(),
            },
        );
        Ok(())
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.uploads.remove(upload_id).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}
