//! Retry Patterns Example
//!
//! Demonstrates the retry executor against a simulated flaky price service:
//! - Transient failures that clear up after a few attempts
//! - Permanent failures that return immediately
//! - Honouring a server's Retry-After hint
//! - Caller-controlled retry decisions
//! - Observing attempts through hooks
//! - Treating an absent value as success
//!
//! Run with `cargo run --example retry_patterns --features tracing` to see the
//! executor's own debug events as well.

use std::time::Duration;

use persevere::prelude::*;
use persevere::testing::CallCounter;

fn quick_policy() -> RetryPolicy {
    RetryPolicy::exponential(Duration::from_millis(50))
        .with_max_retries(4)
        .with_max_delay(Duration::from_millis(400))
        .with_jitter(0.2)
}

// ==================== Transient failures ====================

/// Example 1: the service times out twice, then answers.
async fn example_transient_failures() {
    println!("\n=== Example 1: Transient Failures ===");

    let executor = RetryExecutor::new(quick_policy());
    let calls = CallCounter::new();

    let result = executor
        .execute(|| {
            let n = calls.tick();
            println!("  Attempt {}", n);
            async move {
                if n < 3 {
                    Err(ServiceError::from(TransportError::TimedOut))
                } else {
                    Ok(42_150.75)
                }
            }
        })
        .await;

    match result {
        Ok(price) => println!("Price {} after {} attempts", price, calls.count()),
        Err(e) => println!("Gave up: {}", e),
    }
}

// ==================== Permanent failures ====================

/// Example 2: a 404 is not worth retrying.
async fn example_permanent_failure() {
    println!("\n=== Example 2: Permanent Failure ===");

    let executor = RetryExecutor::new(quick_policy());
    let calls = CallCounter::new();

    let result: Result<f64, _> = executor
        .execute(|| {
            calls.tick();
            async { Err(ServiceError::status(404)) }
        })
        .await;

    println!("Result: {:?} after {} attempt(s)", result, calls.count());
}

// ==================== Rate limiting ====================

/// Example 3: a 429 with `Retry-After: 0.3` waits for the server's hint.
async fn example_rate_limited() {
    println!("\n=== Example 3: Rate Limited ===");

    let executor = RetryExecutor::new(quick_policy());
    let calls = CallCounter::new();
    let start = tokio::time::Instant::now();

    let result = executor
        .execute(|| {
            let n = calls.tick();
            println!("  Attempt {} at {:?}", n, start.elapsed());
            async move {
                if n == 1 {
                    Err(ServiceError::from_status_with_header(429, Some("0.3")))
                } else {
                    Ok("accepted")
                }
            }
        })
        .await;

    println!("Result: {:?}", result);
}

// ==================== Custom predicate ====================

#[derive(Debug)]
enum LedgerError {
    Locked,
    Corrupt,
}

/// Example 4: an error type without a classification, retried by predicate.
async fn example_custom_predicate() {
    println!("\n=== Example 4: Custom Predicate ===");

    let executor = RetryExecutor::new(quick_policy());
    let calls = CallCounter::new();

    let result: Result<(), LedgerError> = executor
        .execute_if(
            || {
                let n = calls.tick();
                async move {
                    if n < 3 {
                        Err(LedgerError::Locked)
                    } else {
                        Err(LedgerError::Corrupt)
                    }
                }
            },
            |err| matches!(err, LedgerError::Locked),
        )
        .await;

    println!("Result: {:?} after {} attempts", result, calls.count());
}

// ==================== Hooks ====================

/// Example 5: watching each failed attempt.
async fn example_hooks() {
    println!("\n=== Example 5: Hooks ===");

    let executor = RetryExecutor::new(quick_policy().with_max_retries(2));

    let result: Result<(), _> = executor
        .execute_with_hooks(
            || async { Err(ServiceError::status(503)) },
            |outcome: &AttemptOutcome<'_, ServiceError>| {
                println!(
                    "  Attempt {} failed ({:?}), next delay: {:?}",
                    outcome.attempt, outcome.classification, outcome.next_delay
                );
            },
        )
        .await;

    println!("Result: {:?}", result);
}

// ==================== Optional values ====================

/// Example 6: "no such quote" is an answer, not a failure.
async fn example_optional() {
    println!("\n=== Example 6: Optional Value ===");

    let executor = RetryExecutor::for_service("quotes");
    let calls = CallCounter::new();

    let result = executor
        .execute_optional(|| {
            calls.tick();
            async { Ok::<Option<f64>, ServiceError>(None) }
        })
        .await;

    println!("Result: {:?} after {} attempt(s)", result, calls.count());
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Retry Patterns Examples");
    println!("=======================");

    example_transient_failures().await;
    example_permanent_failure().await;
    example_rate_limited().await;
    example_custom_predicate().await;
    example_hooks().await;
    example_optional().await;

    println!("\n=== All Examples Completed ===");
}
