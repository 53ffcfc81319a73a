// src/error.rs
//
//! Error taxonomy for the adapter.
//!
//! Store-level failures are translated into one of three kinds before they
//! propagate: `NotFound` (stat-like callers turn this into an empty result),
//! `Transient` (worth re-issuing under a retry policy) and `Permanent`
//! (malformed request, auth failure - never retried).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The object, tag set or listing target does not exist.
    #[error("object not found")]
    NotFound,

    /// Network-level failure (timeout, dropped connection, throttling).
    /// Retried per the injected policy before surfacing.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// The store rejected the request; retrying cannot help. `code` carries
    /// the store's own error code or status category.
    #[error("permanent store failure [{code}]: {message}")]
    Permanent { code: String, message: String },
}

impl StoreError {
    pub fn transient(message: impl Into<String>) -> Self {
        StoreError::Transient(message.into())
    }

    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Permanent {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
