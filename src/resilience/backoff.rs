//! Exponential backoff.

use std::time::Duration;

/// Delay to wait after the failed attempt with zero-based index `attempt`.
///
/// `base * 2^attempt`, saturating; no jitter.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
