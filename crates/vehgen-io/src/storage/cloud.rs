use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use object_store::azure::{MicrosoftAzure, MicrosoftAzureBuilder};
use object_store::client::backoff::BackoffConfig;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, Error as ObjectStoreError, ObjectStore, PutMode, PutOptions};
use tokio::runtime::Runtime;
use url::Url;
use vehgen_core::config::StorageConfig;

use super::{check_blob_name, BlobSink, RetryConfig, UploadReceipt};
use crate::error::{Error, Result};

#[derive(Debug, thiserror::Error)]
pub enum CloudSinkBuilderError {
    #[error("unsupported or malformed URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URI '{uri}' missing account component")]
    MissingAccount { uri: String },

    #[error("no storage account: set AccountName in the connection string or use azure://<account>/<container>")]
    NoAccount,

    #[error("container name is empty")]
    MissingContainer,

    #[error("failed to initialize async runtime: {0}")]
    Runtime(String),

    #[error("object_store builder error: {0}")]
    Builder(String),
}

impl From<CloudSinkBuilderError> for Error {
    fn from(err: CloudSinkBuilderError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Account, container, and key prefix resolved from the connection string
/// and an optional `azure://<account>/<container>[/<prefix>]` URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AzureIdentity {
    account: Option<String>,
    access_key: Option<String>,
    use_emulator: bool,
    container: String,
    prefix: String,
}

impl AzureIdentity {
    fn resolve(cfg: &StorageConfig) -> std::result::Result<Self, CloudSinkBuilderError> {
        let mut identity = match cfg.connection_string.as_deref() {
            Some(conn) => Self::from_connection_string(conn),
            None => Self::default(),
        };
        identity.container = cfg.container.clone();

        if let Some(uri) = cfg.uri.as_deref() {
            let parsed = Url::parse(uri).map_err(|source| CloudSinkBuilderError::InvalidUri {
                uri: uri.to_string(),
                source,
            })?;
            let account = parsed
                .host_str()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| CloudSinkBuilderError::MissingAccount {
                    uri: uri.to_string(),
                })?;
            identity.account = Some(account.to_string());
            let mut segments = parsed.path().trim_matches('/').splitn(2, '/');
            if let Some(container) = segments.next().filter(|s| !s.is_empty()) {
                identity.container = container.to_string();
            }
            identity.prefix = segments.next().unwrap_or("").trim_matches('/').to_string();
        }

        if identity.container.is_empty() {
            return Err(CloudSinkBuilderError::MissingContainer);
        }
        if identity.account.is_none() && !identity.use_emulator {
            return Err(CloudSinkBuilderError::NoAccount);
        }
        Ok(identity)
    }

    /// `Key=Value;Key=Value` with case-insensitive keys.
    fn from_connection_string(conn: &str) -> Self {
        let pairs: HashMap<String, String> = conn
            .split(';')
            .filter_map(|part| {
                let mut kv = part.splitn(2, '=');
                let key = kv.next()?.trim();
                let value = kv.next()?.trim();
                (!key.is_empty()).then(|| (key.to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Self {
            account: pairs.get("accountname").cloned(),
            access_key: pairs.get("accountkey").cloned(),
            use_emulator: pairs
                .get("usedevelopmentstorage")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            container: String::new(),
            prefix: String::new(),
        }
    }

    fn key_for(&self, blob_name: &str) -> String {
        if self.prefix.is_empty() {
            blob_name.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), blob_name)
        }
    }

    fn blob_from_key<'a>(&self, key: &'a str) -> &'a str {
        if self.prefix.is_empty() {
            key
        } else {
            key.strip_prefix(&format!("{}/", self.prefix)).unwrap_or(key)
        }
    }
}

/// Azure Blob Storage sink. Uploads block on a private tokio runtime so the
/// sink can be driven from plain worker threads.
pub struct AzureBlobSink {
    runtime: Runtime,
    store: Arc<dyn ObjectStore>,
    identity: AzureIdentity,
    retry: RetryConfig,
}

impl AzureBlobSink {
    pub fn new(cfg: &StorageConfig) -> std::result::Result<Self, CloudSinkBuilderError> {
        let identity = AzureIdentity::resolve(cfg)?;
        let retry = RetryConfig::from_storage_config(cfg);

        let mut builder = MicrosoftAzureBuilder::new()
            .with_container_name(identity.container.clone())
            .with_use_emulator(identity.use_emulator)
            .with_client_options(ClientOptions::new().with_timeout(retry.timeout))
            // Retries are driven by `run_with_retry`; the client makes one attempt.
            .with_retry(object_store::RetryConfig {
                max_retries: 0,
                retry_timeout: retry.timeout,
                backoff: BackoffConfig {
                    init_backoff: retry.initial_backoff,
                    max_backoff: retry.max_backoff,
                    base: 2.0,
                },
            });
        if let Some(account) = &identity.account {
            builder = builder.with_account(account.clone());
        }
        if let Some(key) = &identity.access_key {
            builder = builder.with_access_key(key.clone());
        }
        let store: MicrosoftAzure = builder
            .build()
            .map_err(|e| CloudSinkBuilderError::Builder(e.to_string()))?;

        let runtime =
            Runtime::new().map_err(|e| CloudSinkBuilderError::Runtime(e.to_string()))?;
        Ok(Self {
            runtime,
            store: Arc::new(store),
            identity,
            retry,
        })
    }

    fn object_path(&self, blob_name: &str) -> Result<ObjectPath> {
        check_blob_name(blob_name)?;
        Ok(ObjectPath::from(self.identity.key_for(blob_name)))
    }

    fn run_with_retry<F, Fut, T>(&self, blob_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = object_store::Result<T>>,
    {
        let mut attempt = 0usize;
        let mut backoff = self.retry.initial_backoff;

        loop {
            match self.runtime.block_on(op()) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if matches!(err, ObjectStoreError::AlreadyExists { .. }) {
                        return Err(Error::AlreadyExists(blob_name.to_string()));
                    }
                    if attempt >= self.retry.max_retries || !is_retryable(&err) {
                        return Err(Error::Storage(format!("{err}")));
                    }
                    attempt += 1;
                    thread::sleep(backoff);
                    backoff = next_backoff(backoff, self.retry.max_backoff);
                }
            }
        }
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current.saturating_mul(2), max)
}

fn is_retryable(err: &ObjectStoreError) -> bool {
    let permanent = matches!(
        err,
        ObjectStoreError::NotFound { .. }
            | ObjectStoreError::AlreadyExists { .. }
            | ObjectStoreError::Precondition { .. }
            | ObjectStoreError::NotImplemented
            | ObjectStoreError::InvalidPath { .. }
    );
    !permanent && !is_auth_failure(err)
}

/// Rejected credentials surface as `Generic` errors carrying the HTTP status
/// somewhere in their source chain.
fn is_auth_failure(err: &ObjectStoreError) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        if AUTH_STATUSES.iter().any(|s| text.contains(s)) {
            return true;
        }
        current = e.source();
    }
    false
}

const AUTH_STATUSES: [&str; 2] = ["401 Unauthorized", "403 Forbidden"];

impl BlobSink for AzureBlobSink {
    fn upload(
        &self,
        blob_name: &str,
        content: &mut dyn Read,
        overwrite: bool,
    ) -> Result<UploadReceipt> {
        let obj_path = self.object_path(blob_name)?;
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        let data = Bytes::from(buf);
        let len = data.len() as u64;
        let mode = if overwrite {
            PutMode::Overwrite
        } else {
            PutMode::Create
        };

        let result = self.run_with_retry(blob_name, || {
            let bytes = data.clone();
            let store = Arc::clone(&self.store);
            let path = obj_path.clone();
            let opts = PutOptions::from(mode.clone());
            async move { store.put_opts(&path, bytes, opts).await }
        })?;

        Ok(UploadReceipt {
            blob_name: blob_name.to_string(),
            bytes: len,
            etag: result.e_tag,
        })
    }

    fn exists(&self, blob_name: &str) -> Result<bool> {
        let obj_path = self.object_path(blob_name)?;
        let head = self.run_with_retry(blob_name, || {
            let store = Arc::clone(&self.store);
            let path = obj_path.clone();
            async move {
                match store.head(&path).await {
                    Ok(_) => Ok(true),
                    Err(ObjectStoreError::NotFound { .. }) => Ok(false),
                    Err(e) => Err(e),
                }
            }
        })?;
        Ok(head)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let store = Arc::clone(&self.store);
        let identity = self.identity.clone();
        let root = (!identity.prefix.is_empty()).then(|| ObjectPath::from(identity.prefix.clone()));
        let mut names = self.runtime.block_on(async move {
            let mut stream = store.list(root.as_ref());
            let mut out = Vec::new();
            while let Some(item) = stream.next().await {
                let meta = item.map_err(|e| Error::Storage(format!("{e}")))?;
                out.push(identity.blob_from_key(meta.location.as_ref()).to_string());
            }
            Ok::<_, Error>(out)
        })?;
        names.retain(|n| n.starts_with(prefix));
        names.sort();
        Ok(names)
    }
}
