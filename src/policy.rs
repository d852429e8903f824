//! Retry policy types and configuration.

use std::time::Duration;

use crate::backoff::exponential_delay;
use crate::error::PolicyError;

/// A retry policy describing how to retry failed operations.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// A policy is built once, usually from a preset, and only read afterwards, so a
/// single value can be shared by any number of concurrent executions.
///
/// The un-jittered delay before retry `k` (1-indexed) is
/// `min(max_delay, initial_delay * multiplier^(k-1))`.
///
/// # Examples
///
/// ```rust
/// use persevere::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_retries(4)
///     .with_max_delay(Duration::from_millis(500))
///     .with_jitter(0.0);
///
/// assert_eq!(policy.max_retries(), 4);
/// assert_eq!(
///     policy.schedule().collect::<Vec<_>>(),
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(400),
///         Duration::from_millis(500),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter_factor: f64,
}

impl Default for RetryPolicy {
    /// Three retries starting at one second, doubling up to 30 seconds, ±10% jitter.
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a doubling policy starting at `initial_delay`.
    ///
    /// The remaining settings come from [`RetryPolicy::default`]; the cap is raised
    /// to `initial_delay` if the default cap would sit below it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persevere::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(250));
    /// assert_eq!(policy.initial_delay(), Duration::from_millis(250));
    /// assert_eq!(policy.multiplier(), 2.0);
    /// ```
    pub fn exponential(initial_delay: Duration) -> Self {
        let defaults = Self::default();
        Self {
            initial_delay,
            max_delay: defaults.max_delay.max(initial_delay),
            ..defaults
        }
    }

    /// More retries, shorter waits: five retries from 500ms growing by 1.5x up to
    /// 15 seconds, ±20% jitter.
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            multiplier: 1.5,
            jitter_factor: 0.2,
        }
    }

    /// The policy to use for calls to a named external service.
    ///
    /// Every service currently uses [`RetryPolicy::default`]. Callers go through
    /// this factory so a service can be given its own tuning without touching call
    /// sites.
    pub fn for_service(service: &str) -> Self {
        #[cfg(feature = "tracing")]
        tracing::trace!(service, "resolved default retry policy");
        #[cfg(not(feature = "tracing"))]
        let _ = service;
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    ///
    /// This does not include the initial attempt. For example, `with_max_retries(3)`
    /// means up to 4 total attempts (1 initial + 3 retries).
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, d: Duration) -> Self {
        self.initial_delay = d;
        self
    }

    /// Set the maximum delay cap.
    ///
    /// Computed delays never exceed this value. A server retry-after hint is not
    /// subject to the cap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persevere::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(100))
    ///     .with_max_retries(10)
    ///     .with_max_delay(Duration::from_secs(5));
    ///
    /// // 100ms, 200ms, 400ms, 800ms, 1600ms, 3200ms, 5000ms, 5000ms...
    /// assert_eq!(policy.schedule().last(), Some(Duration::from_secs(5)));
    /// ```
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the growth factor applied per retry.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set proportional jitter.
    ///
    /// The factor determines the range of randomness: `0.25` means each delay is
    /// scaled by a random factor in `[0.75, 1.25]`. Values outside `[0, 1]` are
    /// clamped; `0.0` makes delays fully deterministic.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self
    }

    /// Get the maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts a persistently failing operation receives.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Get the delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Get the growth factor.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Get the jitter factor.
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// The un-jittered delays for retries `1..=max_retries`.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).map(move |retry| exponential_delay(self, retry))
    }

    /// Validate the policy.
    ///
    /// Policies built through the builder methods can still be nonsensical (zero
    /// initial delay, a cap below the initial delay, a non-positive multiplier), and
    /// deserialized policies bypass the jitter clamp entirely.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persevere::{PolicyError, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// assert!(RetryPolicy::default().validate().is_ok());
    ///
    /// let bad = RetryPolicy::default().with_multiplier(0.0);
    /// assert_eq!(bad.validate(), Err(PolicyError::InvalidMultiplier(0.0)));
    /// ```
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.initial_delay.is_zero() {
            return Err(PolicyError::ZeroInitialDelay);
        }
        if self.max_delay < self.initial_delay {
            return Err(PolicyError::MaxDelayBelowInitial {
                initial_delay: self.initial_delay,
                max_delay: self.max_delay,
            });
        }
        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            return Err(PolicyError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(PolicyError::InvalidJitter(self.jitter_factor));
        }
        Ok(())
    }
}
