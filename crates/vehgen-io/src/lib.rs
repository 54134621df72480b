#![forbid(unsafe_code)]
//! vehgen-io: artifact writers and upload sinks.
//!
//! - `writers`: gzip/plain CSV artifact files.
//! - `storage`: the `BlobSink` upload contract plus filesystem, in-memory
//!   and (feature `azure`) Azure Blob implementations.

pub mod error;
pub mod memory_storage;
pub mod storage;
pub mod writers;

pub use error::{Error, Result};
pub use memory_storage::MemorySink;
pub use storage::{build_sink_from_config, BlobSink, FsSink, RetryConfig, UploadReceipt};
pub use writers::{read_artifact, write_artifact};
