//! Testing utilities for code built on the retry executor.
//!
//! # Examples
//!
//! ## Counting attempts
//!
//! ```rust
//! use persevere::testing::CallCounter;
//! use persevere::{RetryExecutor, RetryPolicy, ServiceError};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let executor = RetryExecutor::new(
//!     RetryPolicy::exponential(Duration::from_millis(1)).with_max_retries(2),
//! );
//! let calls = CallCounter::new();
//!
//! let result: Result<(), _> = executor
//!     .execute(|| {
//!         calls.tick();
//!         async { Err(ServiceError::status(502)) }
//!     })
//!     .await;
//!
//! assert!(result.is_err());
//! assert_eq!(calls.count(), 3);
//! # });
//! ```
//!
//! ## Property testing
//!
//! With the `proptest` feature, [`RetryPolicy`](crate::RetryPolicy) and
//! [`FailureClassification`](crate::FailureClassification) implement
//! `proptest::arbitrary::Arbitrary`, generating valid policies with small delays.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A shareable invocation counter.
///
/// Clones share the same count, so one handle can live inside an operation closure
/// (or a spawned task) while the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicU32>,
}

impl CallCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and return its 1-based number.
    pub fn tick(&self) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of calls recorded so far.
    pub fn count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "proptest")]
mod arbitrary {
    use std::time::Duration;

    use proptest::prelude::*;

    use crate::{FailureClassification, RetryPolicy};

    impl Arbitrary for RetryPolicy {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (0u32..8, 1u64..1_000, 1u64..100, 1.0f64..4.0, 0.0f64..=1.0)
                .prop_map(|(retries, initial_ms, cap_factor, multiplier, jitter)| {
                    RetryPolicy::exponential(Duration::from_millis(initial_ms))
                        .with_max_retries(retries)
                        .with_max_delay(Duration::from_millis(initial_ms * cap_factor))
                        .with_multiplier(multiplier)
                        .with_jitter(jitter)
                })
                .boxed()
        }
    }

    impl Arbitrary for FailureClassification {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                Just(FailureClassification::NetworkTimeout),
                Just(FailureClassification::ConnectionError),
                (500u16..600).prop_map(FailureClassification::ServerError),
                proptest::option::of(0u64..10_000).prop_map(|ms| {
                    FailureClassification::RateLimited(ms.map(Duration::from_millis))
                }),
                Just(FailureClassification::NonRetryable),
            ]
            .boxed()
        }
    }
}
