// src/listing.rs
//
//! Lazy, resumable listing pagination.
//!
//! A [`ListingChunk`] is one page plus everything needed to request the
//! next one. Chunks chain forward only; a failure while advancing is not
//! retried here - the caller restarts the listing from scratch if it wants
//! to try again.

use std::sync::Arc;

use crate::client::{ListChunk, ObjectClient, ObjectStat};
use crate::error::Result;

/// One page of listing results with a handle to fetch the next page.
pub struct ListingChunk {
    client: Arc<dyn ObjectClient>,
    prefix: String,
    delimiter: String,
    page_size: i32,
    chunk: ListChunk,
}

impl ListingChunk {
    /// Issue the first page for `prefix`. The page may be empty; callers
    /// probing for existence treat an empty page as "not found".
    pub(crate) async fn first(
        client: Arc<dyn ObjectClient>,
        prefix: String,
        delimiter: String,
        page_size: i32,
    ) -> Result<ListingChunk> {
        let chunk = client
            .list_objects(&prefix, &delimiter, page_size, None)
            .await?;
        Ok(ListingChunk {
            client,
            prefix,
            delimiter,
            page_size,
            chunk,
        })
    }

    pub fn objects(&self) -> &[ObjectStat] {
        &self.chunk.objects
    }

    pub fn common_prefixes(&self) -> &[String] {
        &self.chunk.common_prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }

    /// Whether the store reported further pages after this one.
    pub fn has_more(&self) -> bool {
        self.chunk.is_truncated
    }

    /// Fetch the next page, consuming this one. Yields `None` when the
    /// store reported no further results.
    pub async fn next(self) -> Result<Option<ListingChunk>> {
        if !self.chunk.is_truncated {
            return Ok(None);
        }
        let Some(token) = self.chunk.continuation.as_deref() else {
            return Ok(None);
        };
        let next = self
            .client
            .list_objects(&self.prefix, &self.delimiter, self.page_size, Some(token))
            .await?;
        Ok(Some(ListingChunk {
            client: self.client,
            prefix: self.prefix,
            delimiter: self.delimiter,
            page_size: self.page_size,
            chunk: next,
        }))
    }
}
