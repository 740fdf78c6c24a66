use super::{Attempt, Operation, Policy};
use crate::Error;
use std::sync::Arc;
use std::time::Duration;

/// Fails an operation with [`Error::TimeoutExceeded`] if it does not complete in time.
///
/// The deadline covers everything the wrapped operation does, so a timeout
/// registered before a retry policy bounds all attempts together, while one
/// registered after it bounds each attempt.
///
/// # Examples
///
/// ```
/// use restflow::policy::{RetryPolicy, TimeoutPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), restflow::Error> {
/// let client = restflow::RestClient::builder()
///     .base_url("https://api.example.com")?
///     .policy(RetryPolicy::retries(1))
///     .policy(TimeoutPolicy::new(Duration::from_millis(200)))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    timeout: Duration,
}

impl TimeoutPolicy {
    /// Creates a policy with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Policy for TimeoutPolicy {
    fn wrap(&self, operation: Operation) -> Operation {
        let timeout = self.timeout;
        Arc::new(move || -> Attempt {
            let attempt = operation();
            Box::pin(async move {
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::debug!(timeout_ms = timeout.as_millis(), "Timeout exceeded");
                        Err(Error::TimeoutExceeded { timeout })
                    }
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::MaterializedBody;
    use crate::response::Exchange;
    use http::{HeaderMap, StatusCode};

    fn delayed(delay: Duration) -> Operation {
        Arc::new(move || -> Attempt {
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                Ok(Exchange::new(
                    StatusCode::NO_CONTENT,
                    HeaderMap::new(),
                    MaterializedBody::Absent,
                ))
            })
        })
    }

    #[tokio::test]
    async fn test_timeout_kept() {
        let policy = TimeoutPolicy::new(Duration::from_millis(200));
        let operation = policy.wrap(delayed(Duration::from_millis(10)));

        let exchange = operation().await.unwrap();
        assert_eq!(exchange.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_timeout_exceeded() {
        let policy = TimeoutPolicy::new(Duration::from_millis(50));
        let operation = policy.wrap(delayed(Duration::from_secs(5)));

        match operation().await {
            Err(Error::TimeoutExceeded { timeout }) => {
                assert_eq!(timeout, Duration::from_millis(50))
            }
            other => panic!("Expected TimeoutExceeded, got {:?}", other),
        }
    }
}
