use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use blake3::Hasher;

use crate::error::{Error, Result};
use crate::storage::{check_blob_name, BlobSink, UploadReceipt};

/// Local directory sink: blob `a/b.csv.gz` lands at `<root>/a/b.csv.gz`.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, blob_name: &str) -> Result<PathBuf> {
        check_blob_name(blob_name)?;
        Ok(blob_name
            .split('/')
            .fold(self.root.clone(), |path, seg| path.join(seg)))
    }
}

impl BlobSink for FsSink {
    fn upload(
        &self,
        blob_name: &str,
        content: &mut dyn Read,
        overwrite: bool,
    ) -> Result<UploadReceipt> {
        let path = self.blob_path(blob_name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut opts = OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }
        let mut file = match opts.open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyExists(blob_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let copied = io::copy(content, &mut file).and_then(|n| file.flush().map(|_| n));
        let bytes = match copied {
            Ok(n) => n,
            Err(e) => {
                // Do not leave a half-written blob behind.
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
        };

        Ok(UploadReceipt {
            blob_name: blob_name.to_string(),
            bytes,
            etag: pseudo_etag(&path),
        })
    }

    fn exists(&self, blob_name: &str) -> Result<bool> {
        Ok(self.blob_path(blob_name)?.is_file())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut results = Vec::new();
        if !self.root.is_dir() {
            return Ok(results);
        }

        fn visit_dirs(dir: &Path, rel: &str, results: &mut Vec<String>) -> io::Result<()> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let blob = if rel.is_empty() {
                    name
                } else {
                    format!("{rel}/{name}")
                };
                if entry.file_type()?.is_dir() {
                    visit_dirs(&entry.path(), &blob, results)?;
                } else {
                    results.push(blob);
                }
            }
            Ok(())
        }

        visit_dirs(&self.root, "", &mut results)?;
        results.retain(|b| b.starts_with(prefix));
        results.sort();
        Ok(results)
    }
}

/// Lightweight pseudo-ETag: hash(size || mtime || path)
fn pseudo_etag(path: &Path) -> Option<String> {
    let meta = fs::metadata(path).ok()?;
    let mut h = Hasher::new();
    h.update(&meta.len().to_le_bytes());
    if let Ok(m) = meta.modified() {
        if let Ok(d) = m.duration_since(std::time::SystemTime::UNIX_EPOCH) {
            h.update(&d.as_secs().to_le_bytes());
            h.update(&d.subsec_nanos().to_le_bytes());
        }
    }
    h.update(path.to_string_lossy().as_bytes());
    Some(h.finalize().to_hex().to_string())
}
