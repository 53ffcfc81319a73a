// src/writer.rs
//
//! Output sinks committing written bytes as one or many object parts.
//!
//! Two variants behind one `ObjectWriter` surface:
//! - single-shot: buffer everything (spilling to a temp file past a
//!   threshold) and issue one PUT at close;
//! - multipart: cut fixed-size parts in write order, upload them through a
//!   bounded worker pool, complete with parts in ascending number order, and
//!   abort the session on any exhausted part failure or on drop.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::client::{CompletedPartHandle, ObjectClient};
use crate::constants::MIN_MULTIPART_PART_SIZE;
use crate::error::{Result, StoreError};
use crate::retry::{RetryPolicy, retry_transient};

/// Output sink returned by `ObjectFs::create_object`.
pub enum ObjectWriter {
    Single(SingleShotWriter),
    Multipart(MultipartWriter),
}

impl std::fmt::Debug for ObjectWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectWriter::Single(_) => f.write_str("ObjectWriter::Single"),
            ObjectWriter::Multipart(_) => f.write_str("ObjectWriter::Multipart"),
        }
    }
}

impl ObjectWriter {
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        match self {
            ObjectWriter::Single(w) => w.write(data).await,
            ObjectWriter::Multipart(w) => w.write(data).await,
        }
    }

    /// Commit the object. Consumes the writer; failing here leaves no
    /// partial object addressable.
    pub async fn close(self) -> Result<()> {
        match self {
            ObjectWriter::Single(w) => w.close().await,
            ObjectWriter::Multipart(w) => w.close().await,
        }
    }

    /// Discard everything written so far without committing.
    pub async fn abort(self) -> Result<()> {
        match self {
            ObjectWriter::Single(_) => Ok(()),
            ObjectWriter::Multipart(w) => w.abort().await,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        match self {
            ObjectWriter::Single(w) => w.bytes_written(),
            ObjectWriter::Multipart(w) => w.bytes_written(),
        }
    }
}

/// Buffers the whole write, then one PUT at close. Content length is known
/// before the request goes out.
///
/// Spilling bounds memory only while writing: `close` reads the spill file
/// back, so peak memory at close is the full object size.
pub struct SingleShotWriter {
    client: Arc<dyn ObjectClient>,
    key: String,
    buf: Vec<u8>,
    spill: Option<std::fs::File>,
    spill_threshold: usize,
    tmp_dirs: Vec<PathBuf>,
    written: u64,
    retry: Arc<dyn RetryPolicy>,
}

impl SingleShotWriter {
    pub(crate) fn new(
        client: Arc<dyn ObjectClient>,
        key: String,
        tmp_dirs: Vec<PathBuf>,
        spill_threshold: usize,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            client,
            key,
            buf: Vec::new(),
            spill: None,
            spill_threshold,
            tmp_dirs,
            written: 0,
            retry,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(file) = self.spill.as_mut() {
            file.write_all(data).map_err(spill_error)?;
        } else {
            self.buf.extend_from_slice(data);
            if self.buf.len() > self.spill_threshold && !self.tmp_dirs.is_empty() {
                let mut file = self.open_spill_file()?;
                file.write_all(&self.buf).map_err(spill_error)?;
                self.buf = Vec::new();
                self.spill = Some(file);
            }
        }
        self.written += data.len() as u64;
        Ok(())
    }

    /// First usable directory from the configured list wins; unusable ones
    /// are logged and skipped.
    fn open_spill_file(&self) -> Result<std::fs::File> {
        let mut last_err: Option<std::io::Error> = None;
        for dir in &self.tmp_dirs {
            match tempfile::tempfile_in(dir) {
                Ok(file) => return Ok(file),
                Err(e) => {
                    log::warn!("spill directory {} unusable: {e}", dir.display());
                    last_err = Some(e);
                }
            }
        }
        Err(spill_error(last_err.unwrap_or_else(|| {
            std::io::Error::other("no spill directory configured")
        })))
    }

    pub async fn close(mut self) -> Result<()> {
        let body = match self.spill.take() {
            Some(mut file) => {
                file.seek(SeekFrom::Start(0)).map_err(spill_error)?;
                let mut contents = Vec::with_capacity(self.written as usize);
                file.read_to_end(&mut contents).map_err(spill_error)?;
                Bytes::from(contents)
            }
            None => Bytes::from(std::mem::take(&mut self.buf)),
        };
        let client = &self.client;
        let key = &self.key;
        retry_transient(&*self.retry, || {
            let body = body.clone();
            async move { client.put_object(key, body).await }
        })
        .await
    }
}

fn spill_error(e: std::io::Error) -> StoreError {
    StoreError::permanent("SpillIo", format!("spill file I/O failed: {e}"))
}

/// Streaming multipart session. Part numbers follow write order; uploads may
/// finish out of order, which never affects correctness because completion
/// lists parts by ascending number.
pub struct MultipartWriter {
    client: Arc<dyn ObjectClient>,
    key: String,
    upload_id: String,
    part_size: usize,
    buf: Vec<u8>,
    next_part_number: i32,
    written: u64,
    slots: Arc<Semaphore>,
    retry: Arc<dyn RetryPolicy>,
    tasks: Vec<JoinHandle<Result<CompletedPartHandle>>>,
    finished: bool,
}

impl MultipartWriter {
    /// Issues the session-initiating call before any bytes are accepted.
    pub(crate) async fn open(
        client: Arc<dyn ObjectClient>,
        key: String,
        part_size: usize,
        slots: Arc<Semaphore>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Result<Self> {
        if part_size < MIN_MULTIPART_PART_SIZE {
            return Err(StoreError::permanent(
                "PartSizeTooSmall",
                format!("part size {part_size} is below the {MIN_MULTIPART_PART_SIZE}-byte store minimum"),
            ));
        }
        let upload_id = client.create_multipart_upload(&key).await?;
        Ok(Self {
            client,
            key,
            upload_id,
            part_size,
            buf: Vec::with_capacity(part_size),
            next_part_number: 1,
            written: 0,
            slots,
            retry,
            tasks: Vec::new(),
            finished: false,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.written += data.len() as u64;

        // Fast path: cut full-size parts straight out of `data` when the
        // internal buffer is empty, avoiding an extra copy through it.
        if self.buf.is_empty() && data.len() >= self.part_size {
            let mut offset = 0usize;
            while data.len() - offset >= self.part_size {
                let end = offset + self.part_size;
                self.spawn_part(data[offset..end].to_vec());
                offset = end;
            }
            if offset < data.len() {
                self.buf.extend_from_slice(&data[offset..]);
            }
            return Ok(());
        }

        self.buf.extend_from_slice(data);
        while self.buf.len() >= self.part_size {
            let chunk = self.buf.drain(..self.part_size).collect::<Vec<u8>>();
            self.spawn_part(chunk);
        }
        Ok(())
    }

    /// Wait for all outstanding parts, then commit the session with parts in
    /// ascending number order. Any exhausted part failure aborts the session
    /// before the error surfaces.
    pub async fn close(mut self) -> Result<()> {
        if !self.buf.is_empty() {
            let tail = std::mem::take(&mut self.buf);
            self.spawn_part(tail);
        }

        // The store rejects a completion with no parts, so a session that
        // never received a byte commits as a plain zero-length PUT instead.
        if self.tasks.is_empty() {
            self.abort_session().await;
            self.finished = true;
            let client = &self.client;
            let key = &self.key;
            return retry_transient(&*self.retry, || async move {
                client.put_object(key, Bytes::new()).await
            })
            .await;
        }

        let tasks = std::mem::take(&mut self.tasks);
        let mut parts = Vec::with_capacity(tasks.len());
        let mut first_failure: Option<StoreError> = None;
        for joined in join_all(tasks).await {
            match joined {
                Ok(Ok(part)) => parts.push(part),
                Ok(Err(e)) => {
                    first_failure.get_or_insert(e);
                }
                Err(e) => {
                    first_failure.get_or_insert_with(|| {
                        StoreError::permanent("PartTaskFailed", e.to_string())
                    });
                }
            }
        }

        if let Some(e) = first_failure {
            self.abort_session().await;
            self.finished = true;
            return Err(e);
        }

        parts.sort_by_key(|p| p.part_number);
        let result = self
            .client
            .complete_multipart_upload(&self.key, &self.upload_id, &parts)
            .await;
        if result.is_err() {
            self.abort_session().await;
        }
        self.finished = true;
        result
    }

    /// Abort the session, discarding buffered and uploaded parts.
    pub async fn abort(mut self) -> Result<()> {
        let tasks = std::mem::take(&mut self.tasks);
        for joined in join_all(tasks).await {
            drop(joined);
        }
        self.abort_session().await;
        self.finished = true;
        Ok(())
    }

    async fn abort_session(&self) {
        if let Err(e) = self
            .client
            .abort_multipart_upload(&self.key, &self.upload_id)
            .await
        {
            log::warn!("failed to abort multipart upload for {}: {e}", self.key);
        }
    }

    fn spawn_part(&mut self, chunk: Vec<u8>) {
        let part_number = self.next_part_number;
        self.next_part_number += 1;

        let client = self.client.clone();
        let key = self.key.clone();
        let upload_id = self.upload_id.clone();
        let slots = self.slots.clone();
        let retry = self.retry.clone();
        let body = Bytes::from(chunk);

        let handle = tokio::spawn(async move {
            let _permit = slots
                .acquire_owned()
                .await
                .map_err(|_| StoreError::permanent("PoolClosed", "upload pool closed"))?;
            let e_tag = retry_transient(&*retry, || {
                let body = body.clone();
                let client = &client;
                let key = &key;
                let upload_id = &upload_id;
                async move {
                    client
                        .upload_part(key, upload_id, part_number, body)
                        .await
                }
            })
            .await?;
            Ok(CompletedPartHandle { part_number, e_tag })
        });
        self.tasks.push(handle);
    }
}

impl Drop for MultipartWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Best effort: no await possible here, hand the abort to the runtime.
        let client = self.client.clone();
        let key = self.key.clone();
        let upload_id = self.upload_id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = client.abort_multipart_upload(&key, &upload_id).await {
                    log::warn!("failed to abort dropped multipart upload for {key}: {e}");
                }
            });
        }
    }
}
