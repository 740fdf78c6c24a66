//! Resilience policies.
//!
//! A [`Policy`] decorates an [`Operation`], the zero-argument asynchronous send
//! attempt of one logical request, and may re-invoke it or race it against a
//! deadline. Policies are composed in registration order, the first registered
//! policy being the outermost: with `[retry, timeout]` every attempt is timed out
//! individually and the retry policy sees each timeout.
//!
//! Errors raised by the wrapped operation are already classified
//! ([`Error::RequestFailure`](crate::Error::RequestFailure),
//! [`Error::ResponseStatus`](crate::Error::ResponseStatus)). Errors a policy raises
//! itself, such as [`Error::TimeoutExceeded`](crate::Error::TimeoutExceeded), reach
//! the caller as they are, without request diagnostics.

mod retry;
mod timeout;

pub use retry::{
    AndPredicate, OrPredicate, RetryOn5xx, RetryOnConnectionError, RetryOnRetryable,
    RetryOnTimeout, RetryPolicy, RetryPredicate, RetryStrategy,
};
pub use timeout::TimeoutPolicy;

use crate::response::Exchange;
use crate::Result;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// One in-flight send attempt.
pub type Attempt = BoxFuture<'static, Result<Exchange>>;

/// A re-invocable send attempt.
pub type Operation = Arc<dyn Fn() -> Attempt + Send + Sync>;

/// A decorator over an [`Operation`].
///
/// # Examples
///
/// ```
/// use restflow::policy::{Operation, Policy};
/// use std::sync::Arc;
///
/// /// Logs every attempt before passing it on.
/// struct LogAttempts;
///
/// impl Policy for LogAttempts {
///     fn wrap(&self, operation: Operation) -> Operation {
///         Arc::new(move || {
///             tracing::debug!("attempt");
///             operation()
///         })
///     }
/// }
/// ```
pub trait Policy: Send + Sync {
    /// Returns an operation that applies this policy around `operation`.
    fn wrap(&self, operation: Operation) -> Operation;
}

/// Applies `policies` around `operation`, the first policy ending up outermost.
pub(crate) fn compose(policies: &[Arc<dyn Policy>], operation: Operation) -> Operation {
    policies
        .iter()
        .rev()
        .fold(operation, |operation, policy| policy.wrap(operation))
}
