//! vehgen: synthetic vehicle telemetry batches, uploaded day by day.
//!
//! Facade over the workspace crates; the `vehgen` binary lives in `vehgen-cli`.

pub use vehgen_core as core;
pub use vehgen_exec as exec;
pub use vehgen_io as io;
pub use vehgen_synth as synth;

pub use vehgen_core::{ColumnSpec, GeneratorConfig};
pub use vehgen_exec::{DayOutcome, MemoryLog, Pipeline, RunLog, RunReport, TracingLog};
pub use vehgen_io::{BlobSink, FsSink, MemorySink};
