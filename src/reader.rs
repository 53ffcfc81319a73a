// src/reader.rs
//
//! Retrying, seekable reads over ranged GETs.
//!
//! A reader never fetches more than the configured chunk size per request.
//! Transient failures are re-issued under the injected policy; a short read
//! from the transport continues from the last byte received rather than
//! restarting the range, so already-delivered bytes are never fetched twice.

use std::cmp::min;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::client::ObjectClient;
use crate::error::{Result, StoreError};
use crate::retry::{RetryPolicy, retry_transient};

/// Cursor-based byte stream over one object.
pub struct ObjectReader {
    client: Arc<dyn ObjectClient>,
    key: String,
    pos: u64,
    chunk_size: usize,
    retry: Arc<dyn RetryPolicy>,
}

impl ObjectReader {
    pub(crate) fn new(
        client: Arc<dyn ObjectClient>,
        key: String,
        offset: u64,
        chunk_size: usize,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            client,
            key,
            pos: offset,
            chunk_size: chunk_size.max(1),
            retry,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Move the cursor. No I/O happens until the next read.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Read up to `max_len` bytes from the cursor, bounded by the chunk
    /// size. Returns an empty buffer at end of object. The attempt budget
    /// applies per request; it resets after every successful range.
    pub async fn read(&mut self, max_len: usize) -> Result<Bytes> {
        if max_len == 0 {
            return Ok(Bytes::new());
        }
        let want = min(max_len, self.chunk_size) as u64;
        let end = self.pos + want - 1;
        let client = &self.client;
        let key = &self.key;
        let pos = self.pos;
        let bytes = retry_transient(&*self.retry, || async move {
            client.get_object_range(key, pos, end).await
        })
        .await?;
        self.pos += bytes.len() as u64;
        Ok(bytes)
    }

    /// Read exactly `len` bytes from the cursor, issuing as many ranged
    /// requests as needed. Bytes received before a transient failure are
    /// kept; the retry continues from the byte after them.
    pub async fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(len);
        while out.len() < len {
            let chunk = self.read(len - out.len()).await?;
            if chunk.is_empty() {
                return Err(StoreError::permanent(
                    "UnexpectedEof",
                    format!(
                        "object {} ended after {} of {} requested bytes",
                        self.key,
                        out.len(),
                        len
                    ),
                ));
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}

/// Positional reader for concurrent random access. Carries no cursor, so
/// `&self` reads from independent offsets can run in parallel.
pub struct PositionReader {
    client: Arc<dyn ObjectClient>,
    key: String,
    file_len: u64,
    chunk_size: usize,
    retry: Arc<dyn RetryPolicy>,
}

impl PositionReader {
    pub(crate) fn new(
        client: Arc<dyn ObjectClient>,
        key: String,
        file_len: u64,
        chunk_size: usize,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            client,
            key,
            file_len,
            chunk_size: chunk_size.max(1),
            retry,
        }
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Read up to `len` bytes starting at `offset`, clamped to the known
    /// object length. Short only when the object is shorter than declared.
    pub async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes> {
        if offset >= self.file_len {
            return Ok(Bytes::new());
        }
        let len = min(len as u64, self.file_len - offset);
        let mut out = BytesMut::with_capacity(len as usize);
        let mut pos = offset;
        let end_total = offset + len;
        while pos < end_total {
            let end = min(pos + self.chunk_size as u64, end_total) - 1;
            let client = &self.client;
            let key = &self.key;
            let chunk = retry_transient(&*self.retry, || async move {
                client.get_object_range(key, pos, end).await
            })
            .await?;
            if chunk.is_empty() {
                break;
            }
            pos += chunk.len() as u64;
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }
}
