//! Upload sinks for day artifacts.
//!
//! - `fs`: mirror blobs into a local directory (`file://`).
//! - `cloud`: Azure Blob Storage built on top of `object_store` (feature `azure`).
//! - `crate::memory_storage`: in-memory map (`memory://`), mostly for tests.
//!
//! Also exposes `RetryConfig` and a builder that chooses the sink from the
//! storage URI or, when none is set, from the connection string.

mod fs;
pub use fs::FsSink;

#[cfg(feature = "azure")]
mod cloud;
#[cfg(feature = "azure")]
pub use cloud::{AzureBlobSink, CloudSinkBuilderError};

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use vehgen_core::config::StorageConfig;

use crate::error::{Error, Result};
use crate::memory_storage::MemorySink;

/// Opaque destination for finished artifacts.
pub trait BlobSink: Send + Sync {
    /// Store `content` under `blob_name`. With `overwrite == false` an existing
    /// blob is left alone and `Error::AlreadyExists` is returned.
    fn upload(&self, blob_name: &str, content: &mut dyn Read, overwrite: bool)
        -> Result<UploadReceipt>;

    fn exists(&self, blob_name: &str) -> Result<bool>;

    /// All blob names starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub blob_name: String,
    pub bytes: u64,
    pub etag: Option<String>,
}

/// Exponential backoff policy for remote sinks.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Per-attempt network timeout.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(480),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn from_storage_config(cfg: &StorageConfig) -> Self {
        Self {
            max_retries: cfg.retry_max_retries,
            initial_backoff: Duration::from_millis(cfg.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.retry_max_backoff_ms),
            timeout: Duration::from_millis(cfg.timeout_ms),
        }
    }
}

/// Build the correct sink using the provided configuration.
pub fn build_sink_from_config(cfg: &StorageConfig) -> Result<Arc<dyn BlobSink>> {
    match cfg.scheme() {
        Some("memory") => Ok(Arc::new(MemorySink::new())),
        Some("file") => {
            let uri = cfg.uri.as_deref().unwrap_or_default();
            let root = file_uri_to_path(uri)?;
            Ok(Arc::new(FsSink::new(root.join(&cfg.container))))
        }
        Some("azure") | Some("azblob") => {
            #[cfg(feature = "azure")]
            {
                let sink = AzureBlobSink::new(cfg)?;
                Ok(Arc::new(sink))
            }

            #[cfg(not(feature = "azure"))]
            {
                Err(Error::Config(
                    "vehgen was built without the `azure` feature; rebuild with `--features vehgen-io/azure`"
                        .into(),
                ))
            }
        }
        Some(other) => Err(Error::Config(format!("unsupported storage scheme '{other}'"))),
        None => Err(Error::Config(
            "no upload sink configured: set storageConnectionString or storageUri".into(),
        )),
    }
}

fn file_uri_to_path(uri: &str) -> Result<PathBuf> {
    let parsed =
        Url::parse(uri).map_err(|e| Error::Config(format!("malformed storage URI '{uri}': {e}")))?;
    parsed
        .to_file_path()
        .map_err(|_| Error::Config(format!("storage URI '{uri}' is not a local path")))
}

/// Validate a blob name the way every sink expects it: relative, `/`-separated,
/// no empty or dot segments.
pub(crate) fn check_blob_name(blob_name: &str) -> Result<()> {
    let valid = !blob_name.is_empty()
        && !blob_name.starts_with('/')
        && blob_name
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if valid {
        Ok(())
    } else {
        Err(Error::Storage(format!("invalid blob name '{blob_name}'")))
    }
}
