//! # Persevere
//!
//! Retry-with-backoff execution for unreliable asynchronous operations, typically
//! calls to a third-party service.
//!
//! For every failure the executor decides three things: whether another attempt
//! is worthwhile, how long to wait before it, and when to give up and hand the
//! failure back.
//!
//! - **Classify**: failures map onto a closed [`FailureClassification`]. Timeouts,
//!   dropped connections, 5xx and 429 are retryable; everything else, including
//!   anything unrecognised, is not.
//! - **Back off**: the wait before retry `k` is
//!   `min(max_delay, initial_delay * multiplier^(k-1))` with proportional jitter.
//!   A server's retry-after hint replaces the computed value.
//! - **Execute**: [`RetryExecutor`] drives the loop and returns the operation's own
//!   final error, never a wrapper.
//!
//! ## Quick Example
//!
//! ```rust
//! use persevere::{RetryExecutor, RetryPolicy, ServiceError};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let executor = RetryExecutor::new(
//!     RetryPolicy::exponential(Duration::from_millis(10))
//!         .with_max_retries(3)
//!         .with_max_delay(Duration::from_millis(100))
//!         .with_jitter(0.0),
//! );
//!
//! let mut attempts = 0;
//! let result: Result<u32, ServiceError> = executor
//!     .execute(|| {
//!         attempts += 1;
//!         async { Err(ServiceError::status(404)) }
//!     })
//!     .await;
//!
//! // 404 is not worth retrying
//! assert_eq!(result, Err(ServiceError::status(404)));
//! assert_eq!(attempts, 1);
//! # });
//! ```
//!
//! ## Features
//!
//! - `tracing`: debug events for every scheduled retry and terminal failure.
//! - `serde`: `Serialize`/`Deserialize` for [`RetryPolicy`] and
//!   [`FailureClassification`].
//! - `proptest`: `Arbitrary` impls (see [`testing`]).

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod backoff;
pub mod classify;
pub mod error;
pub mod executor;
pub mod policy;
pub mod testing;

// Re-exports
pub use classify::{
    classify_error, classify_status, parse_retry_after, Classify, FailureClassification,
};
pub use error::{PolicyError, ServiceError, TransportError};
pub use executor::{AttemptOutcome, RetryExecutor};
pub use policy::RetryPolicy;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classify::{Classify, FailureClassification};
    pub use crate::error::{ServiceError, TransportError};
    pub use crate::executor::{AttemptOutcome, RetryExecutor};
    pub use crate::policy::RetryPolicy;
}
