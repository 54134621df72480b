#![forbid(unsafe_code)]
//! vehgen-synth: random values for generated telemetry rows.
//!
//! Nothing here is meant to be realistic. Every generator takes the caller's
//! PRNG so a day task can own one seeded generator for all of its rows.

pub mod row;
pub mod value;
pub mod vins;

pub use row::{RowContext, RowSynthesizer};
pub use value::{random_in_range, truncate_decimal, typed_value};
pub use vins::VinPool;
