//! Example demonstrating resilience policies.
//!
//! This example shows how to:
//! - Retry with exponential backoff
//! - Restrict retries to certain errors
//! - Bound every attempt with a timeout
//! - Write a custom policy
//!
//! Run with: `cargo run --example retry_policies`

use restflow::policy::{
    Attempt, OrPredicate, Operation, Policy, RetryOn5xx, RetryOnTimeout, RetryPolicy,
    RetryStrategy, TimeoutPolicy,
};
use restflow::rate_limit::RateLimitConfig;
use restflow::RestClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prints how long each attempt took.
struct AttemptTimer {
    attempts: Arc<AtomicUsize>,
}

impl Policy for AttemptTimer {
    fn wrap(&self, operation: Operation) -> Operation {
        let attempts = Arc::clone(&self.attempts);
        Arc::new(move || -> Attempt {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let pending = operation();
            Box::pin(async move {
                let started = Instant::now();
                let result = pending.await;
                println!(
                    "  attempt {} finished in {:?} ({})",
                    attempt,
                    started.elapsed(),
                    if result.is_ok() { "ok" } else { "failed" }
                );
                result
            })
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), restflow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restflow=info")
        .init();

    println!("=== Exponential Backoff ===");
    let retry = RetryPolicy::new(RetryStrategy::ExponentialBackoff {
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(2),
        max_retries: 3,
        jitter: true,
    })
    .with_predicate(OrPredicate::new(vec![
        Box::new(RetryOn5xx),
        Box::new(RetryOnTimeout),
    ]))
    .with_rate_limit(RateLimitConfig::default().with_max_wait(Duration::from_secs(10)));

    let attempts = Arc::new(AtomicUsize::new(0));
    let client = RestClient::builder()
        .base_url("https://httpbin.org")?
        .policy(retry)
        .policy(AttemptTimer {
            attempts: Arc::clone(&attempts),
        })
        .policy(TimeoutPolicy::new(Duration::from_secs(5)))
        .build()?;

    match client.get("status/503")?.returning_nothing().execute().await {
        Ok(()) => println!("Unexpected success"),
        Err(e) => println!("Gave up after {} attempts: {}", attempts.load(Ordering::SeqCst), e),
    }
    println!();

    println!("=== No Retry On Client Errors ===");
    attempts.store(0, Ordering::SeqCst);
    match client.get("status/400")?.returning_nothing().execute().await {
        Ok(()) => println!("Unexpected success"),
        Err(e) => println!("Failed after {} attempt: {}", attempts.load(Ordering::SeqCst), e),
    }
    println!();

    println!("=== Timeout Per Attempt ===");
    attempts.store(0, Ordering::SeqCst);
    let impatient = RestClient::builder()
        .base_url("https://httpbin.org")?
        .policy(RetryPolicy::retries(1))
        .policy(AttemptTimer {
            attempts: Arc::clone(&attempts),
        })
        .policy(TimeoutPolicy::new(Duration::from_millis(500)))
        .build()?;

    match impatient.get("delay/3")?.returning_json_value().fetch().await {
        Ok(body) => println!("Success: {}", body),
        Err(e) => println!("Timed out: {} (is_timeout = {})", e, e.is_timeout()),
    }

    Ok(())
}
