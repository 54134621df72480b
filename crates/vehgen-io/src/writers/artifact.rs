//! Day artifact files: the fully materialized CSV text, streamed through the
//! codec into a newly created file.
//!
//! A crash mid-write leaves a truncated file behind; there is no recovery.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use vehgen_core::config::Compression;

use crate::error::Result;

/// Write `text` to a new file at `path`. Fails if the file already exists.
/// Returns the number of bytes on disk.
pub fn write_artifact(path: &Path, codec: Compression, text: &str) -> Result<u64> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut out = BufWriter::new(file);
    match codec {
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(&mut out, GzLevel::default());
            encoder.write_all(text.as_bytes())?;
            encoder.finish()?;
        }
        Compression::None => out.write_all(text.as_bytes())?,
    }
    out.flush()?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Read an artifact back as text.
pub fn read_artifact(path: &Path, codec: Compression) -> Result<String> {
    let file = File::open(path)?;
    let mut text = String::new();
    match codec {
        Compression::Gzip => {
            GzDecoder::new(file).read_to_string(&mut text)?;
        }
        Compression::None => {
            let mut file = file;
            file.read_to_string(&mut text)?;
        }
    }
    Ok(text)
}
