//! Run log handed to the pipeline.
//!
//! The pipeline never reaches for a global logger; it writes to whatever
//! `RunLog` it was built with. `TracingLog` forwards to `tracing`, so the
//! binary's subscriber (and the per-day span) decides formatting.

use std::sync::{Mutex, PoisonError};

pub trait RunLog: Send + Sync {
    fn info(&self, msg: &str);
    fn error(&self, msg: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl RunLog for TracingLog {
    fn info(&self, msg: &str) {
        tracing::info!(target: "vehgen::pipeline", "{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "vehgen::pipeline", "{msg}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

/// Collects lines in memory; handy in tests and for embedding callers.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.level == LogLevel::Error)
            .map(|l| l.message)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.message.contains(needle))
    }

    fn push(&self, level: LogLevel, msg: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogLine {
                level,
                message: msg.to_string(),
            });
    }
}

impl RunLog for MemoryLog {
    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }

    fn error(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }
}
