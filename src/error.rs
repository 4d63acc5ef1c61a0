// src/error.rs
//! Typed failures for the three pipeline layers: adapters, state store, notifier.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Adapter-layer failure for a single fetch.
#[derive(Error, Debug)]
pub enum SourceFetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("source is throttling requests (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
}

impl SourceFetchError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceFetchError::Network(_) => "network",
            SourceFetchError::Parse(_) => "parse",
            SourceFetchError::RateLimited { .. } => "rate_limit",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceFetchError::RateLimited { .. })
    }
}

/// State-store failure. Missing files are not an error.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("state io on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoding state failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Notification delivery failure. Logged by the pipeline, never fatal.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("transport unreachable: {0}")]
    Unreachable(String),

    #[error("recipient rejected: {0}")]
    InvalidRecipient(String),

    #[error("gateway authentication failed: {0}")]
    Auth(String),

    #[error("gateway rejected message (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },
}
