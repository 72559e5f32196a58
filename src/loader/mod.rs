//! Data-loading port.
//!
//! A [`DatasetSource`] hands back raw bytes for a dataset path; decoding into
//! records happens once, in [`load_dataset`]. Any failure is a [`LoadError`]
//! and aborts dashboard initialization.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::time::Instant;
use thiserror::Error;

use crate::logging::log_dataset_loaded;

mod fs;
mod http;
pub mod retry;

pub use fs::FsSource;
pub use http::HttpSource;
pub use retry::{RetryConfig, RetryingSource};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load {path}: {reason}")]
    Unreachable { path: String, reason: String },
    #[error("failed to load {path}: status {status}")]
    Status { path: String, status: u16 },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::Unreachable { path, .. }
            | LoadError::Status { path, .. }
            | LoadError::Decode { path, .. } => path,
        }
    }

    /// Transport failures and transient statuses may succeed on a second try;
    /// a payload that does not decode will not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LoadError::Unreachable { .. } => true,
            LoadError::Status { status, .. } => is_retryable_http_status(*status),
            LoadError::Decode { .. } => false,
        }
    }
}

pub fn is_retryable_http_status(status: u16) -> bool {
    matches!(status,
        408 |   // Request Timeout
        429 |   // Too Many Requests
        500 |   // Internal Server Error
        502 |   // Bad Gateway
        503 |   // Service Unavailable
        504     // Gateway Timeout
    )
}

#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<S: DatasetSource + ?Sized> DatasetSource for Box<S> {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        (**self).fetch(path).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Fetch and decode one dataset: a JSON array of records.
pub async fn load_dataset<T, S>(source: &S, path: &str) -> Result<Vec<T>, LoadError>
where
    T: DeserializeOwned,
    S: DatasetSource + ?Sized,
{
    let started = Instant::now();
    let bytes = source.fetch(path).await?;
    let rows: Vec<T> = serde_json::from_slice(&bytes).map_err(|source| LoadError::Decode {
        path: path.to_string(),
        source,
    })?;
    log_dataset_loaded(
        path,
        rows.len(),
        &fingerprint(&bytes),
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory source; paths listed in `failures` fail that many times first.
    #[derive(Default)]
    pub struct MemorySource {
        pub files: HashMap<String, String>,
        pub failures: HashMap<String, (u32, u16)>,
        pub calls: AtomicU32,
    }

    impl MemorySource {
        pub fn with(mut self, path: &str, body: &str) -> Self {
            self.files.insert(path.to_string(), body.to_string());
            self
        }

        pub fn failing(mut self, path: &str, times: u32, status: u16) -> Self {
            self.failures.insert(path.to_string(), (times, status));
            self
        }
    }

    #[async_trait]
    impl DatasetSource for MemorySource {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((times, status)) = self.failures.get(path) {
                if call < *times {
                    return Err(LoadError::Status { path: path.to_string(), status: *status });
                }
            }
            self.files
                .get(path)
                .map(|body| body.clone().into_bytes())
                .ok_or_else(|| LoadError::Status { path: path.to_string(), status: 404 })
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
