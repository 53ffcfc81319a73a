// src/config.rs
//
//! Runtime configuration for the adapter.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LISTING_PAGE_SIZE, DEFAULT_MULTIPART_PART_SIZE,
    DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_READ_CHUNK_SIZE, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_SPILL_THRESHOLD, ENV_LISTING_PAGE_SIZE,
    ENV_MULTIPART_PART_SIZE, ENV_MULTIPART_UPLOAD_THREADS, ENV_READ_CHUNK_SIZE,
    MAX_MULTIPART_UPLOAD_THREADS,
};

/// Recognized options for one adapter instance.
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Key prefix under the bucket that the filesystem root maps to.
    /// Empty string means the whole bucket.
    pub root_prefix: String,
    /// Use multipart uploads for `create_object` when true, single-shot PUTs
    /// otherwise.
    pub multipart_enabled: bool,
    /// Maximum number of concurrent in-flight part uploads, shared by all
    /// multipart sessions of the adapter instance.
    pub multipart_upload_threads: usize,
    /// Target size of each multipart part in bytes.
    pub part_size: usize,
    /// Largest single ranged GET a reader will issue.
    pub read_chunk_size: usize,
    /// Maximum entries per listing page.
    pub listing_page_size: i32,
    /// Connect timeout on the underlying transport.
    pub connect_timeout: Duration,
    /// Per-request operation timeout on the underlying transport.
    pub operation_timeout: Duration,
    /// Upper bound on concurrent store connections; also caps the part
    /// upload worker count.
    pub max_connections: usize,
    /// Candidate directories for single-shot spill files. Empty disables
    /// spilling (writes stay in memory).
    pub tmp_dirs: Vec<PathBuf>,
    /// In-memory bytes a single-shot writer holds before spilling.
    pub spill_threshold: usize,
    /// Attempt budget for the default retry policy.
    pub retry_attempts: u32,
    /// Base backoff delay for the default retry policy.
    pub retry_base_delay: Duration,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root_prefix: String::new(),
            multipart_enabled: false,
            multipart_upload_threads: default_upload_threads(),
            part_size: DEFAULT_MULTIPART_PART_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            listing_page_size: DEFAULT_LISTING_PAGE_SIZE,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            max_connections: MAX_MULTIPART_UPLOAD_THREADS,
            tmp_dirs: Vec::new(),
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

impl FsConfig {
    /// Defaults with `OBJECTFS_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(threads) = env_parse::<usize>(ENV_MULTIPART_UPLOAD_THREADS) {
            cfg.multipart_upload_threads = threads.clamp(1, MAX_MULTIPART_UPLOAD_THREADS);
        }
        if let Some(part_size) = env_parse::<usize>(ENV_MULTIPART_PART_SIZE) {
            cfg.part_size = part_size;
        }
        if let Some(chunk) = env_parse::<usize>(ENV_READ_CHUNK_SIZE) {
            cfg.read_chunk_size = chunk.max(1);
        }
        if let Some(page) = env_parse::<i32>(ENV_LISTING_PAGE_SIZE) {
            cfg.listing_page_size = page.max(1);
        }
        cfg
    }
}

/// Sizing default for the part upload pool: twice the core count, capped.
fn default_upload_threads() -> usize {
    let cores = num_cpus::get();
    std::cmp::min(std::cmp::max(8, cores * 2), MAX_MULTIPART_UPLOAD_THREADS)
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}
