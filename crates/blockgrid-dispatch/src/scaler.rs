//! One-shot pool sizing.
//!
//! Sizing runs once per request cycle, from the first completed multiply
//! latency (the footprint). Model: the request's multiplicative calls
//! would cost `footprint * calls_per_request` ms serialized on one
//! connection; dividing by the budget headroom `|deadline - footprint|`
//! gives the connections needed to land inside the budget. Open-loop by
//! design: nothing re-measures or corrects after the first call.

use tracing::warn;

/// Number of pool entries needed to serve the remaining calls.
///
/// Clamped to `1..=max_pool_size`. A zero divisor (deadline exactly equal
/// to the footprint) fails soft to the cap: the first call alone consumed
/// the whole budget, so the rest get maximum parallelism.
pub fn target_pool_size(
    footprint_ms: f64,
    deadline_ms: f64,
    calls_per_request: u32,
    max_pool_size: usize,
) -> usize {
    let headroom = (deadline_ms - footprint_ms).abs();
    if headroom == 0.0 {
        warn!(
            footprint_ms,
            deadline_ms, "deadline equals footprint, sizing to pool cap"
        );
        return max_pool_size;
    }

    let desired = (footprint_ms * f64::from(calls_per_request) / headroom).ceil();
    if !desired.is_finite() || desired < 1.0 {
        return 1;
    }
    (desired as usize).min(max_pool_size)
}
