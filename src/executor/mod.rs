//! The attempt loop.
//!
//! [`RetryExecutor`] runs an operation, classifies each failure (or asks a caller
//! supplied predicate), waits out the backoff and tries again until the operation
//! succeeds, the failure is not worth retrying, or the policy's retries run out.
//!
//! # Operations
//!
//! An operation is a closure that produces a fresh future per attempt. Each retry
//! calls it again, so every attempt gets a new request rather than a replay of a
//! consumed one:
//!
//! ```rust
//! use persevere::{RetryExecutor, RetryPolicy, ServiceError, TransportError};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let executor = RetryExecutor::new(
//!     RetryPolicy::exponential(Duration::from_millis(1)).with_max_retries(3),
//! );
//!
//! let mut calls = 0;
//! let result = executor
//!     .execute(|| {
//!         calls += 1;
//!         let n = calls;
//!         async move {
//!             if n < 3 {
//!                 Err(ServiceError::from(TransportError::TimedOut))
//!             } else {
//!                 Ok("quote")
//!             }
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(result, Ok("quote"));
//! assert_eq!(calls, 3);
//! # });
//! ```
//!
//! # Cancellation
//!
//! Waiting between attempts is a `tokio::time::sleep`. Dropping the future returned
//! by any `execute*` method (aborting the task, losing a `select!`, an outer
//! `tokio::time::timeout`) stops the loop where it is suspended; the operation is
//! not invoked again.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::backoff;
use crate::classify::{Classify, FailureClassification};
use crate::policy::RetryPolicy;

/// Information about a failed attempt, passed to hooks.
#[derive(Debug, Clone)]
pub struct AttemptOutcome<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// When the failure was observed.
    pub at: Instant,
    /// The classifier's verdict. `None` when a caller predicate decided instead.
    pub classification: Option<FailureClassification>,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt, or `None` when this failure is terminal.
    pub next_delay: Option<Duration>,
    /// Total elapsed time since the first attempt started.
    pub elapsed: Duration,
}

impl<E> AttemptOutcome<'_, E> {
    /// Returns true when this failure ends the loop.
    pub fn is_terminal(&self) -> bool {
        self.next_delay.is_none()
    }
}

struct Verdict {
    retry: bool,
    classification: Option<FailureClassification>,
}

impl Verdict {
    fn classified(classification: FailureClassification) -> Self {
        Self {
            retry: classification.is_retryable(),
            classification: Some(classification),
        }
    }

    fn decided(retry: bool) -> Self {
        Self {
            retry,
            classification: None,
        }
    }
}

/// Runs operations under a [`RetryPolicy`].
///
/// The executor only holds its policy. Every call keeps its own attempt counter,
/// so one executor can drive any number of concurrent operations without them
/// affecting each other.
///
/// The error a caller sees is always the operation's own error from its final
/// attempt. The executor adds no error kinds of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl From<RetryPolicy> for RetryExecutor {
    fn from(policy: RetryPolicy) -> Self {
        Self::new(policy)
    }
}

impl RetryExecutor {
    /// Create an executor for `policy`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Executor using [`RetryPolicy::aggressive`].
    pub fn aggressive() -> Self {
        Self::new(RetryPolicy::aggressive())
    }

    /// Executor using [`RetryPolicy::for_service`].
    pub fn for_service(service: &str) -> Self {
        Self::new(RetryPolicy::for_service(service))
    }

    /// The policy this executor applies.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation`, retrying failures the error's [`Classify`] impl marks as
    /// retryable.
    ///
    /// Non-retryable failures return on first occurrence with no delay. A
    /// persistently failing operation is invoked `max_retries + 1` times.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(
            operation,
            |error: &E| Verdict::classified(error.classify()),
            |_| {},
        )
        .await
    }

    /// Run `operation`, retrying only when `should_retry` returns true.
    ///
    /// The predicate replaces the classifier entirely for this call, so the error
    /// type needs no [`Classify`] impl. Delays follow the exponential formula; no
    /// retry-after hint is consulted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persevere::{RetryExecutor, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let executor = RetryExecutor::new(
    ///     RetryPolicy::exponential(Duration::from_millis(1)).with_max_retries(2),
    /// );
    ///
    /// let mut calls = 0;
    /// let result: Result<(), &str> = executor
    ///     .execute_if(
    ///         || {
    ///             calls += 1;
    ///             async { Err("locked") }
    ///         },
    ///         |err| *err == "locked",
    ///     )
    ///     .await;
    ///
    /// assert_eq!(result, Err("locked"));
    /// assert_eq!(calls, 3);
    /// # });
    /// ```
    pub async fn execute_if<T, E, F, Fut, P>(&self, operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        self.run(
            operation,
            |error: &E| Verdict::decided(should_retry(error)),
            |_| {},
        )
        .await
    }

    /// Run an operation whose success value may legitimately be absent.
    ///
    /// `Ok(None)` is a successful outcome: it is returned immediately and never
    /// retried. Only errors go through the retry loop.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persevere::{RetryExecutor, ServiceError};
    ///
    /// # tokio_test::block_on(async {
    /// let executor = RetryExecutor::default();
    /// let mut calls = 0;
    /// let cached: Result<Option<u64>, ServiceError> = executor
    ///     .execute_optional(|| {
    ///         calls += 1;
    ///         async { Ok(None) }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(cached, Ok(None));
    /// assert_eq!(calls, 1);
    /// # });
    /// ```
    pub async fn execute_optional<T, E, F, Fut>(&self, operation: F) -> Result<Option<T>, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        self.execute(operation).await
    }

    /// Like [`execute`](Self::execute), calling `on_failure` for every failed
    /// attempt.
    ///
    /// The hook runs before the backoff wait, and also for the terminal failure
    /// (with `next_delay: None`). It is synchronous and should not block; use it
    /// for logging or metrics.
    pub async fn execute_with_hooks<T, E, F, Fut, H>(
        &self,
        operation: F,
        on_failure: H,
    ) -> Result<T, E>
    where
        E: Classify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: Fn(&AttemptOutcome<'_, E>),
    {
        self.run(
            operation,
            |error: &E| Verdict::classified(error.classify()),
            on_failure,
        )
        .await
    }

    async fn run<T, E, F, Fut, D, H>(&self, mut operation: F, decide: D, on_failure: H) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        D: Fn(&E) -> Verdict,
        H: Fn(&AttemptOutcome<'_, E>),
    {
        let start = Instant::now();
        let mut attempt = 1u32;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    #[cfg(feature = "tracing")]
                    if attempt > 1 {
                        tracing::trace!(attempt, "operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let verdict = decide(&error);
            let next_delay = (verdict.retry && attempt <= self.policy.max_retries()).then(|| {
                backoff::delay_for(&self.policy, attempt, verdict.classification.as_ref())
            });

            on_failure(&AttemptOutcome {
                attempt,
                at: Instant::now(),
                classification: verdict.classification,
                error: &error,
                next_delay,
                elapsed: start.elapsed(),
            });

            match next_delay {
                Some(delay) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        attempt,
                        delay = ?delay,
                        classification = ?verdict.classification,
                        "attempt failed, retrying"
                    );
                    drop(error);
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        attempt,
                        retryable = verdict.retry,
                        classification = ?verdict.classification,
                        "attempt failed, giving up"
                    );
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
