#![forbid(unsafe_code)]
//! vehgen-core: plain data shared by every other crate.
//!
//! - `config`: settings file + environment layering, validation, storage snapshot.
//! - `schema`: the `toBeGenerated` column spec and its name/type dispatch tags.
//! - `day`: mapping of a day offset onto a calendar day and its time window.
//!
//! No random generation, no artifact or network IO lives here.

pub mod config;
pub mod day;
pub mod error;
pub mod schema;

pub use config::{Compression, GeneratorConfig, GeoBounds, StorageConfig};
pub use day::DayWindow;
pub use error::{Error, Result};
pub use schema::{ColumnDef, ColumnRole, ColumnSpec, ValueType};
