//! Retry strategies and predicates for transient failures.

use super::{Attempt, Operation, Policy};
use crate::rate_limit::{RateLimitConfig, RateLimitInfo};
use crate::Error;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// How often and with which delays to retry.
///
/// # Examples
///
/// ```
/// use restflow::policy::RetryStrategy;
/// use std::time::Duration;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Never retry.
    #[default]
    None,

    /// Wait `initial_delay * 2^(retry - 1)`, capped at `max_delay`.
    ///
    /// With `jitter` the delay is scaled by a random factor between 0.5 and 1.0.
    ExponentialBackoff {
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Upper bound for any delay.
        max_delay: Duration,
        /// Number of retries after the initial attempt.
        max_retries: usize,
        /// Randomize delays.
        jitter: bool,
    },

    /// Wait the same delay before every retry.
    Linear {
        /// Delay between attempts.
        delay: Duration,
        /// Number of retries after the initial attempt.
        max_retries: usize,
    },

    /// Ask a function for the delay before retry `n` (1-indexed); `None` stops.
    Custom {
        /// Returns the delay before the given retry.
        delay_fn: fn(retry: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// Returns the delay before the given retry (1-indexed), or `None` once retries
    /// are exhausted.
    pub fn delay_for_attempt(&self, retry: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if retry > *max_retries {
                    return None;
                }

                let multiplier = 2u32.saturating_pow(retry.saturating_sub(1) as u32);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    let factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                (retry <= *max_retries).then_some(*delay)
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(retry),
        }
    }

    /// Returns the maximum number of retries, if known up front.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::ExponentialBackoff { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Decides whether a failed attempt is worth repeating.
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use restflow::policy::RetryPredicate;
/// use restflow::Error;
///
/// struct RetryOnConflict;
///
/// impl RetryPredicate for RetryOnConflict {
///     fn should_retry(&self, error: &Error, _retry: usize) -> bool {
///         error.status() == Some(StatusCode::CONFLICT)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` if the operation should run again after `error`.
    ///
    /// `retry` is the number of the retry that would follow (1-indexed).
    fn should_retry(&self, error: &Error, retry: usize) -> bool;
}

/// Retries every error for which [`Error::is_retryable`] holds.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _retry: usize) -> bool {
        error.is_retryable()
    }
}

/// Retries rejected 5xx statuses only.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _retry: usize) -> bool {
        matches!(
            error,
            Error::ResponseStatus { response, .. } if response.status().is_server_error()
        )
    }
}

/// Retries timeouts only, from a [`TimeoutPolicy`](super::TimeoutPolicy) or the
/// transport timeout.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _retry: usize) -> bool {
        error.is_timeout()
    }
}

/// Retries requests that got no response.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _retry: usize) -> bool {
        matches!(error, Error::RequestFailure { .. })
    }
}

/// Retries if any of its predicates does.
///
/// # Examples
///
/// ```
/// use restflow::policy::{OrPredicate, RetryOn5xx, RetryOnTimeout};
///
/// let predicate = OrPredicate::new(vec![Box::new(RetryOn5xx), Box::new(RetryOnTimeout)]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a predicate from a list of alternatives.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, retry: usize) -> bool {
        self.predicates.iter().any(|p| p.should_retry(error, retry))
    }
}

/// Retries only if all of its predicates do.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a predicate from a list of requirements.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, retry: usize) -> bool {
        self.predicates.iter().all(|p| p.should_retry(error, retry))
    }
}

/// Re-runs the wrapped operation while the predicate accepts its error and the
/// strategy allows another retry.
///
/// When retries are exhausted the last error is returned unchanged. Rejected
/// responses carrying `Retry-After` or rate limit reset headers delay the next
/// attempt accordingly, unless rate limit handling is disabled.
///
/// # Examples
///
/// ```
/// use restflow::policy::{RetryOnConnectionError, RetryPolicy, RetryStrategy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(50),
///     max_delay: Duration::from_secs(2),
///     max_retries: 4,
///     jitter: true,
/// })
/// .with_predicate(RetryOnConnectionError);
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    predicate: Arc<dyn RetryPredicate>,
    rate_limit: RateLimitConfig,
}

impl RetryPolicy {
    /// Creates a policy that retries [retryable](Error::is_retryable) errors.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            predicate: Arc::new(RetryOnRetryable),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Creates a policy that retries up to `max_retries` times without delay.
    pub fn retries(max_retries: usize) -> Self {
        Self::new(RetryStrategy::Linear {
            delay: Duration::ZERO,
            max_retries,
        })
    }

    /// Replaces the predicate deciding which errors are retried.
    pub fn with_predicate<P: RetryPredicate + 'static>(mut self, predicate: P) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Replaces the rate limit handling.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// The configured strategy.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// The delay before `retry`, or `None` if `error` should be returned.
    fn delay_after(&self, error: &Error, retry: usize) -> Option<Duration> {
        if !self.predicate.should_retry(error, retry) {
            return None;
        }
        let scheduled = self.strategy.delay_for_attempt(retry)?;

        let hinted = error
            .headers()
            .filter(|_| self.rate_limit.enabled)
            .and_then(|headers| RateLimitInfo::from_headers(headers).delay(self.rate_limit.max_wait));
        Some(hinted.unwrap_or(scheduled))
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

impl Policy for RetryPolicy {
    fn wrap(&self, operation: Operation) -> Operation {
        let policy = self.clone();
        Arc::new(move || -> Attempt {
            let policy = policy.clone();
            let operation = operation.clone();
            Box::pin(async move {
                let mut retry = 1;
                loop {
                    let error = match operation().await {
                        Ok(exchange) => return Ok(exchange),
                        Err(error) => error,
                    };

                    let Some(delay) = policy.delay_after(&error, retry) else {
                        return Err(error);
                    };

                    tracing::info!(
                        retry,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            })
        })
    }
}
