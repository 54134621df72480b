#![forbid(unsafe_code)]
//! vehgen-exec: day tasks, window scheduling, and the pipeline runtime.
//!
//! One day-chain is generate → upload → cleanup, run sequentially on its own
//! thread. Chains are launched in fixed windows of `parallelTaskCount` days;
//! a window is fully joined before the next one starts.

pub mod log;
pub mod pipeline;
pub mod scheduler;
pub mod task;

pub use log::{LogLevel, LogLine, MemoryLog, RunLog, TracingLog};
pub use pipeline::{DayOutcome, DayReport, ExecError, Pipeline, RunReport};
pub use scheduler::plan_windows;
pub use task::{Artifact, BatchContext, DayTask};
