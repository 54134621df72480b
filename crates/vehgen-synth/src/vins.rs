//! Shared VIN pool: `prefix + n` with `n` drawn from `[0, count)`.
//!
//! Draws are independent, so the pool usually contains duplicates.

use rand::prelude::IndexedRandom;
use rand::Rng;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VinPool {
    vins: Vec<String>,
}

impl VinPool {
    pub fn generate<R: Rng + ?Sized>(count: u32, prefix: &str, rng: &mut R) -> Self {
        let vins = (0..count)
            .map(|_| format!("{prefix}{}", rng.random_range(0..count)))
            .collect();
        Self { vins }
    }

    pub fn from_vec(vins: Vec<String>) -> Self {
        Self { vins }
    }

    /// Uniform pick. `None` only for an empty pool.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.vins.choose(rng).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vins.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.vins
    }
}
