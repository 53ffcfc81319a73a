// src/s3_store.rs
//
//! S3-compatible `ObjectClient` backend over the async AWS Rust SDK.
//!
//! Client construction follows the usual environment surface: AWS_* creds,
//! optional AWS_ENDPOINT_URL for S3-compatible services (path-style
//! addressing is forced for those), and the adapter's configured transport
//! timeouts. SDK failures are translated into the adapter's error kinds,
//! preserving the store's own error code.

use std::env;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier, Tag, Tagging,
};
use bytes::Bytes;

use crate::client::{CompletedPartHandle, ListChunk, ObjectClient, ObjectStat, TagPairs};
use crate::config::FsConfig;
use crate::constants::DEFAULT_REGION;
use crate::error::{Result, StoreError};

const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NotFound", "404", "NoSuchUpload"];
const TRANSIENT_CODES: &[&str] = &[
    "RequestTimeout",
    "SlowDown",
    "ServiceUnavailable",
    "InternalError",
    "Throttling",
    "ThrottlingException",
];

/// One bucket of an S3-compatible store.
pub struct S3ObjectClient {
    client: Client,
    bucket: String,
}

impl S3ObjectClient {
    /// Wrap an already-constructed SDK client.
    pub fn new(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    /// Build the SDK client from the environment (`.env` honored) and the
    /// adapter's transport timeouts.
    pub async fn from_env(bucket: &str, cfg: &FsConfig) -> Result<Self> {
        dotenvy::dotenv().ok();

        if env::var("AWS_ACCESS_KEY_ID").is_err() || env::var("AWS_SECRET_ACCESS_KEY").is_err() {
            return Err(StoreError::permanent(
                "MissingCredentials",
                "AWS_ACCESS_KEY_ID and/or AWS_SECRET_ACCESS_KEY are not set",
            ));
        }

        let region = RegionProviderChain::first_try(env::var("AWS_REGION").ok().map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(cfg.connect_timeout)
            .operation_timeout(cfg.operation_timeout)
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region)
            .timeout_config(timeout_config);
        if let Ok(endpoint) = env::var("AWS_ENDPOINT_URL") {
            if !endpoint.is_empty() {
                loader = loader.endpoint_url(endpoint);
            }
        }
        let sdk_cfg = loader.load().await;

        // Path-style addressing is what S3-compatible services behind custom
        // endpoints expect; virtual-hosted style breaks there.
        let s3_cfg = aws_sdk_s3::config::Builder::from(&sdk_cfg)
            .force_path_style(true)
            .build();
        Ok(Self::new(Client::from_conf(s3_cfg), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure onto the adapter taxonomy, keeping the store's code.
fn translate<E>(err: SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::transient(err.to_string())
        }
        SdkError::ServiceError(_) => {
            let status = err.raw_response().map(|r| r.status().as_u16());
            classify_service_error(err.code(), status, err.message())
        }
        _ => StoreError::permanent("Unknown", err.to_string()),
    }
}

/// Classify a service error from its code and HTTP status. HEAD responses
/// carry no XML error body, so the code can be absent there and the raw
/// status is the only signal; a bodyless 404 is still "not found".
fn classify_service_error(
    code: Option<&str>,
    status: Option<u16>,
    message: Option<&str>,
) -> StoreError {
    if code.is_some_and(|c| NOT_FOUND_CODES.contains(&c)) || status == Some(404) {
        return StoreError::NotFound;
    }
    let message = message.unwrap_or("request failed");
    match code {
        Some(c) if TRANSIENT_CODES.contains(&c) => {
            StoreError::Transient(format!("[{c}] {message}"))
        }
        Some(c) => StoreError::permanent(c, message),
        None => match status {
            Some(s) if s == 429 || (500..=599).contains(&s) => {
                StoreError::transient(format!("HTTP {s}: {message}"))
            }
            Some(s) => StoreError::permanent(format!("Http{s}"), message),
            None => StoreError::permanent("Unknown", message),
        },
    }
}

fn build_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::permanent("InvalidRequest", e.to_string())
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(body.len() as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn get_object_metadata(&self, key: &str) -> Result<Option<ObjectStat>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => Ok(Some(ObjectStat {
                key: key.to_string(),
                e_tag: resp.e_tag().map(str::to_string),
                size: resp.content_length().unwrap_or(0).max(0) as u64,
                last_modified_ms: resp.last_modified().and_then(|t| t.to_millis().ok()),
            })),
            Err(e) => match translate(e) {
                StoreError::NotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn get_object_range(&self, key: &str, start: u64, end: u64) -> Result<Bytes> {
        let range = format!("bytes={start}-{end}");
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(range)
            .send()
            .await
        {
            Ok(resp) => resp,
            // Reading at or past the end of the object is EOF, not a failure.
            Err(e) if e.as_service_error().and_then(|se| se.code()) == Some("InvalidRange") => {
                return Ok(Bytes::new());
            }
            Err(e) => return Err(translate(e)),
        };
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::transient(format!("body stream failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<Vec<String>> {
        let identifiers = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build().map_err(build_error))
            .collect::<Result<Vec<_>>>()?;
        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .build()
            .map_err(build_error)?;
        let resp = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(translate)?;
        Ok(resp
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(str::to_string))
            .collect())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        max_keys: i32,
        continuation: Option<&str>,
    ) -> Result<ListChunk> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys);
        if !delimiter.is_empty() {
            req = req.delimiter(delimiter);
        }
        if let Some(token) = continuation {
            req = req.continuation_token(token);
        }
        let resp = req.send().await.map_err(translate)?;

        let objects = resp
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                Some(ObjectStat {
                    key,
                    e_tag: obj.e_tag().map(str::to_string),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified_ms: obj.last_modified().and_then(|t| t.to_millis().ok()),
                })
            })
            .collect();
        let common_prefixes = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();
        Ok(ListChunk {
            objects,
            common_prefixes,
            continuation: resp.next_continuation_token().map(str::to_string),
            is_truncated: resp.is_truncated().unwrap_or(false),
        })
    }

    async fn copy_object(&self, src_key: &str, dst_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src_key))
            .key(dst_key)
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn get_object_tags(&self, key: &str) -> Result<Option<TagPairs>> {
        match self
            .client
            .get_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => Ok(Some(
                resp.tag_set()
                    .iter()
                    .map(|t| (t.key().to_string(), t.value().to_string()))
                    .collect(),
            )),
            Err(e) => match translate(e) {
                StoreError::NotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn set_object_tags(&self, key: &str, tags: TagPairs) -> Result<()> {
        let tag_set = tags
            .into_iter()
            .map(|(name, value)| {
                Tag::builder()
                    .key(name)
                    .value(value)
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>>>()?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(build_error)?;
        self.client
            .put_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(translate)?;
        let upload_id = resp.upload_id().unwrap_or_default().to_string();
        if upload_id.is_empty() {
            return Err(StoreError::permanent(
                "EmptyUploadId",
                "CreateMultipartUpload returned no upload id",
            ));
        }
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let resp = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(translate)?;
        let e_tag = resp.e_tag().unwrap_or_default().to_string();
        if e_tag.is_empty() {
            return Err(StoreError::permanent(
                "EmptyETag",
                format!("UploadPart {part_number} returned no entity tag"),
            ));
        }
        Ok(e_tag)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartHandle],
    ) -> Result<()> {
        let completed: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .set_part_number(Some(p.part_number))
                    .set_e_tag(Some(p.e_tag.clone()))
                    .build()
            })
            .collect();
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(translate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodyless_404_is_not_found() {
        // HEAD on a missing key: no error code, only the status line.
        let err = classify_service_error(None, Some(404), None);
        assert!(err.is_not_found());
    }

    #[test]
    fn coded_not_found_wins_regardless_of_status() {
        let err = classify_service_error(Some("NoSuchKey"), Some(404), Some("gone"));
        assert!(err.is_not_found());
    }

    #[test]
    fn throttling_code_is_transient() {
        let err = classify_service_error(Some("SlowDown"), Some(503), Some("busy"));
        assert!(err.is_transient());
    }

    #[test]
    fn codeless_server_errors_are_transient() {
        assert!(classify_service_error(None, Some(500), None).is_transient());
        assert!(classify_service_error(None, Some(429), None).is_transient());
    }

    #[test]
    fn coded_client_errors_stay_permanent() {
        let err = classify_service_error(Some("AccessDenied"), Some(403), Some("no"));
        assert!(matches!(err, StoreError::Permanent { code, .. } if code == "AccessDenied"));
    }
}
