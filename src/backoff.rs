//! Delay calculation between attempts.
//!
//! Everything here is a pure function of the policy, the retry index and the
//! previous failure, apart from the jitter draw. With a jitter factor of zero no
//! random number is drawn and delays are exactly reproducible.

use std::time::Duration;

use rand::Rng;

use crate::classify::FailureClassification;
use crate::policy::RetryPolicy;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// The delay to wait before retry `retry` (1-indexed).
///
/// A [`FailureClassification::RateLimited`] failure carrying a retry-after hint
/// returns that hint verbatim. Every other case takes the exponential delay,
/// applies the policy's jitter and clamps the result to `[0, max_delay]`.
///
/// # Examples
///
/// ```rust
/// use persevere::{backoff, FailureClassification, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100)).with_jitter(0.0);
///
/// assert_eq!(
///     backoff::delay_for(&policy, 3, Some(&FailureClassification::NetworkTimeout)),
///     Duration::from_millis(400)
/// );
///
/// let limited = FailureClassification::RateLimited(Some(Duration::from_secs(7)));
/// assert_eq!(backoff::delay_for(&policy, 3, Some(&limited)), Duration::from_secs(7));
/// ```
pub fn delay_for(
    policy: &RetryPolicy,
    retry: u32,
    classification: Option<&FailureClassification>,
) -> Duration {
    if let Some(after) = classification.and_then(FailureClassification::retry_after) {
        return after;
    }
    let base = exponential_delay(policy, retry);
    apply_jitter(base, policy.jitter_factor(), policy.max_delay())
}

/// `min(max_delay, initial_delay * multiplier^(retry-1))`, without jitter.
///
/// `retry` is 1-indexed; `0` is treated like `1`.
pub fn exponential_delay(policy: &RetryPolicy, retry: u32) -> Duration {
    let max = policy.max_delay();
    let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
    let nanos = policy.initial_delay().as_nanos() as f64 * policy.multiplier().powi(exponent);

    if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
        return max;
    }
    if nanos <= 0.0 {
        return Duration::ZERO;
    }
    nanos_to_duration(nanos)
}

/// Scale `base` by a uniform factor drawn from `[1 - factor, 1 + factor]` and clamp
/// the result to `[0, max_delay]`.
///
/// A factor of zero (or NaN) returns `base` capped at `max_delay` without drawing.
pub fn apply_jitter(base: Duration, factor: f64, max_delay: Duration) -> Duration {
    if factor.is_nan() || factor <= 0.0 || base.is_zero() {
        return base.min(max_delay);
    }
    let factor = factor.min(1.0);
    let scale = rand::rng().random_range((1.0 - factor)..=(1.0 + factor));
    let nanos = base.as_nanos() as f64 * scale;

    if nanos >= max_delay.as_nanos() as f64 {
        max_delay
    } else {
        nanos_to_duration(nanos.max(0.0))
    }
}

/// Convert a finite, non-negative nanosecond count, rounding to the nearest nanosecond.
fn nanos_to_duration(nanos: f64) -> Duration {
    let secs = (nanos / NANOS_PER_SEC).trunc();
    let subsec = (nanos - secs * NANOS_PER_SEC)
        .round()
        .clamp(0.0, NANOS_PER_SEC - 1.0);
    Duration::new(secs as u64, subsec as u32)
}
