//! Fixed-window partitioning of the day range.
//!
//! Not a refilling pool: a slow day holds back the next window even when
//! other slots are idle.

use std::ops::Range;

/// Split `[0, count_of_days)` into consecutive windows of `parallel` offsets.
/// The last window holds the remainder. `parallel` is clamped to at least 1.
pub fn plan_windows(count_of_days: u32, parallel: usize) -> Vec<Range<u32>> {
    let step = u32::try_from(parallel.max(1)).unwrap_or(u32::MAX);
    let mut windows = Vec::new();
    let mut start = 0u32;
    while start < count_of_days {
        let end = start.saturating_add(step).min(count_of_days);
        windows.push(start..end);
        start = end;
    }
    windows
}
