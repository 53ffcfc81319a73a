// src/constants.rs
//
// Centralized constants for objectfs to avoid hardcoded values throughout the codebase

/// Separator used in filesystem paths and object keys.
pub const PATH_SEPARATOR: &str = "/";

/// Suffix appended to a directory's key to form its folder-marker key.
/// A zero-length object at that key flags an explicitly created directory.
pub const FOLDER_SUFFIX: &str = "/";

/// Default maximum number of entries per listing page (store maximum)
pub const DEFAULT_LISTING_PAGE_SIZE: i32 = 1000;

/// Maximum number of keys per batch-delete request (store maximum)
pub const MAX_BATCH_DELETE_KEYS: usize = 1000;

/// Default multipart upload part size (16 MB)
pub const DEFAULT_MULTIPART_PART_SIZE: usize = 16 * 1024 * 1024;

/// Minimum multipart upload part size (5 MB - store requirement)
pub const MIN_MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// Default chunk size for ranged object reads (4 MB)
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default buffer size a single-shot writer may hold in memory before
/// spilling to a temporary file (8 MB)
pub const DEFAULT_SPILL_THRESHOLD: usize = 8 * 1024 * 1024;

/// Default retry attempt count for transient store failures
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay between retry attempts (milliseconds)
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;

/// Default cap on the backoff delay between retry attempts (milliseconds)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Default connect timeout for the underlying transport (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default per-request operation timeout (seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;

/// Cap on the multipart upload worker count to avoid task explosion
pub const MAX_MULTIPART_UPLOAD_THREADS: usize = 64;

/// Mode reported by the fixed, no-op permissions capability
pub const DEFAULT_OBJECT_MODE: u32 = 0o700;

/// Fallback region when none is configured in the environment
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable overriding the multipart upload worker count
pub const ENV_MULTIPART_UPLOAD_THREADS: &str = "OBJECTFS_MULTIPART_THREADS";

/// Environment variable overriding the multipart part size (bytes)
pub const ENV_MULTIPART_PART_SIZE: &str = "OBJECTFS_PART_SIZE";

/// Environment variable overriding the ranged-read chunk size (bytes)
pub const ENV_READ_CHUNK_SIZE: &str = "OBJECTFS_READ_CHUNK_SIZE";

/// Environment variable overriding the listing page size
pub const ENV_LISTING_PAGE_SIZE: &str = "OBJECTFS_LISTING_PAGE_SIZE";
