//! In-memory sink for testing and dry runs.
//!
//! Provides a HashMap-backed sink that implements `BlobSink`.
//! Selected with the `memory://` storage URI.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::storage::{check_blob_name, BlobSink, UploadReceipt};

/// Thread-safe in-memory sink. Clones share the same blobs.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored under `blob_name`, if any.
    pub fn get(&self, blob_name: &str) -> Option<Vec<u8>> {
        self.lock().get(blob_name).cloned()
    }

    /// Get the number of stored blobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobSink for MemorySink {
    fn upload(
        &self,
        blob_name: &str,
        content: &mut dyn Read,
        overwrite: bool,
    ) -> Result<UploadReceipt> {
        check_blob_name(blob_name)?;
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;

        let mut data = self.lock();
        if !overwrite && data.contains_key(blob_name) {
            return Err(Error::AlreadyExists(blob_name.to_string()));
        }
        let len = bytes.len() as u64;
        data.insert(blob_name.to_string(), bytes);
        Ok(UploadReceipt {
            blob_name: blob_name.to_string(),
            bytes: len,
            etag: Some(format!("mem-{}-{len}", blob_name.len())),
        })
    }

    fn exists(&self, blob_name: &str) -> Result<bool> {
        Ok(self.lock().contains_key(blob_name))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut result: Vec<String> = self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        result.sort();
        Ok(result)
    }
}
