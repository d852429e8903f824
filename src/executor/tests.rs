//! Tests for the attempt loop.

use super::*;
use crate::error::{ServiceError, TransportError};
use crate::testing::CallCounter;
use std::sync::Mutex;

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::exponential(Duration::from_millis(10))
        .with_max_retries(max_retries)
        .with_max_delay(Duration::from_millis(100))
        .with_jitter(0.0)
}

fn timeout() -> ServiceError {
    ServiceError::Transport(TransportError::TimedOut)
}

#[tokio::test(start_paused = true)]
async fn test_success_on_first_attempt_has_no_delay() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();
    let start = Instant::now();

    let result = executor
        .execute(|| {
            calls.tick();
            async { Ok::<_, ServiceError>(42) }
        })
        .await;

    assert_eq!(result, Ok(42));
    assert_eq!(calls.count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_exhausts_all_attempts() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result: Result<(), _> = executor
        .execute(|| {
            calls.tick();
            async { Err(timeout()) }
        })
        .await;

    assert_eq!(result, Err(timeout()));
    assert_eq!(calls.count(), 4); // 1 initial + 3 retries
}

#[tokio::test(start_paused = true)]
async fn test_waits_follow_exponential_schedule() {
    let executor = RetryExecutor::new(fast_policy(3));
    let start = Instant::now();
    let seen = Mutex::new(Vec::new());

    let _: Result<(), _> = executor
        .execute(|| {
            seen.lock().unwrap().push(start.elapsed());
            async { Err(timeout()) }
        })
        .await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Duration::ZERO,
            Duration::from_millis(10),
            Duration::from_millis(30),
            Duration::from_millis(70),
        ]
    );
    // no wait after the terminal failure
    assert_eq!(start.elapsed(), Duration::from_millis(70));
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_failure_returns_immediately() {
    let executor = RetryExecutor::new(fast_policy(5));
    let calls = CallCounter::new();
    let start = Instant::now();

    let result: Result<(), _> = executor
        .execute(|| {
            calls.tick();
            async { Err(ServiceError::status(404)) }
        })
        .await;

    assert_eq!(result, Err(ServiceError::status(404)));
    assert_eq!(calls.count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_one_attempt() {
    let executor = RetryExecutor::new(fast_policy(0));
    let calls = CallCounter::new();
    let start = Instant::now();

    let result: Result<(), _> = executor
        .execute(|| {
            calls.tick();
            async { Err(timeout()) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.count(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_third_attempt() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result = executor
        .execute(|| {
            let n = calls.tick();
            async move {
                if n < 3 {
                    Err(timeout())
                } else {
                    Ok("success")
                }
            }
        })
        .await;

    assert_eq!(result, Ok("success"));
    assert_eq!(calls.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_final_error_is_from_last_attempt() {
    let executor = RetryExecutor::new(fast_policy(2));
    let calls = CallCounter::new();

    let result: Result<(), _> = executor
        .execute(|| {
            let n = calls.tick();
            async move {
                match n {
                    1 => Err(ServiceError::status(503)),
                    2 => Err(ServiceError::from(TransportError::ConnectionLost)),
                    _ => Err(ServiceError::status(502)),
                }
            }
        })
        .await;

    assert_eq!(result, Err(ServiceError::status(502)));
    assert_eq!(calls.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_stops_when_failure_turns_permanent() {
    let executor = RetryExecutor::new(fast_policy(5));
    let calls = CallCounter::new();

    let result: Result<(), _> = executor
        .execute(|| {
            let n = calls.tick();
            async move {
                if n < 2 {
                    Err(ServiceError::status(500))
                } else {
                    Err(ServiceError::Decoding("truncated body".to_string()))
                }
            }
        })
        .await;

    assert_eq!(
        result,
        Err(ServiceError::Decoding("truncated body".to_string()))
    );
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_governs_wait() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();
    let start = Instant::now();
    let second_call_at = Mutex::new(None);

    let result = executor
        .execute(|| {
            let n = calls.tick();
            if n == 2 {
                *second_call_at.lock().unwrap() = Some(start.elapsed());
            }
            async move {
                if n == 1 {
                    Err(ServiceError::rate_limited(Some(Duration::from_millis(200))))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(2));
    assert_eq!(
        *second_call_at.lock().unwrap(),
        Some(Duration::from_millis(200))
    );
}

#[tokio::test(start_paused = true)]
async fn test_execute_if_false_forces_single_attempt() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result: Result<(), _> = executor
        .execute_if(
            || {
                calls.tick();
                async { Err(timeout()) }
            },
            |_| false,
        )
        .await;

    assert_eq!(result, Err(timeout()));
    assert_eq!(calls.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execute_if_true_retries_unclassified_errors() {
    #[derive(Debug, PartialEq)]
    struct Opaque;

    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result: Result<(), _> = executor
        .execute_if(
            || {
                calls.tick();
                async { Err(Opaque) }
            },
            |_| true,
        )
        .await;

    assert_eq!(result, Err(Opaque));
    assert_eq!(calls.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_execute_if_overrides_rate_limit_classification() {
    let executor = RetryExecutor::new(fast_policy(1));
    let start = Instant::now();

    let _: Result<(), _> = executor
        .execute_if(
            || async { Err(ServiceError::rate_limited(Some(Duration::from_secs(60)))) },
            |_| true,
        )
        .await;

    // the predicate path never consults the classifier, so the hint is unused
    assert_eq!(start.elapsed(), Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_execute_optional_none_is_success() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result = executor
        .execute_optional(|| {
            calls.tick();
            async { Ok::<Option<u32>, ServiceError>(None) }
        })
        .await;

    assert_eq!(result, Ok(None));
    assert_eq!(calls.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execute_optional_retries_errors() {
    let executor = RetryExecutor::new(fast_policy(3));
    let calls = CallCounter::new();

    let result = executor
        .execute_optional(|| {
            let n = calls.tick();
            async move {
                if n == 1 {
                    Err(ServiceError::status(500))
                } else {
                    Ok(Some("rate"))
                }
            }
        })
        .await;

    assert_eq!(result, Ok(Some("rate")));
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hooks_see_every_failure() {
    let executor = RetryExecutor::new(fast_policy(2));
    let events = Mutex::new(Vec::new());

    let result: Result<(), _> = executor
        .execute_with_hooks(
            || async { Err(ServiceError::status(503)) },
            |outcome: &AttemptOutcome<'_, ServiceError>| {
                events.lock().unwrap().push((
                    outcome.attempt,
                    outcome.classification,
                    outcome.next_delay,
                    outcome.is_terminal(),
                ));
            },
        )
        .await;

    assert!(result.is_err());
    let server = Some(FailureClassification::ServerError(503));
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            (1, server, Some(Duration::from_millis(10)), false),
            (2, server, Some(Duration::from_millis(20)), false),
            (3, server, None, true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hook_not_called_on_success() {
    let executor = RetryExecutor::new(fast_policy(2));
    let hook_calls = CallCounter::new();

    let result = executor
        .execute_with_hooks(
            || async { Ok::<_, ServiceError>("ok") },
            |_: &AttemptOutcome<'_, ServiceError>| {
                hook_calls.tick();
            },
        )
        .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(hook_calls.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hook_elapsed_tracks_backoff() {
    let executor = RetryExecutor::new(fast_policy(2));
    let elapsed = Mutex::new(Vec::new());

    let _: Result<(), _> = executor
        .execute_with_hooks(
            || async { Err(timeout()) },
            |outcome: &AttemptOutcome<'_, ServiceError>| {
                elapsed.lock().unwrap().push(outcome.elapsed);
            },
        )
        .await;

    assert_eq!(
        *elapsed.lock().unwrap(),
        vec![
            Duration::ZERO,
            Duration::from_millis(10),
            Duration::from_millis(30),
        ]
    );
}

#[test]
fn test_constructors() {
    assert_eq!(RetryExecutor::default().policy(), &RetryPolicy::default());
    assert_eq!(RetryExecutor::aggressive().policy(), &RetryPolicy::aggressive());
    assert_eq!(
        RetryExecutor::for_service("exchange-rates").policy(),
        &RetryPolicy::default()
    );
    let policy = fast_policy(1);
    assert_eq!(RetryExecutor::from(policy.clone()).policy(), &policy);
}
