//! Artifact writers.

mod artifact;

pub use artifact::{read_artifact, write_artifact};
