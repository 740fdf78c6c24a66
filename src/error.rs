//! Error types for REST calls.
//!
//! Failures of a logical request fall into three families, each carrying the
//! [`Diagnostics`] captured when the request started:
//!
//! - [`Error::RequestFailure`]: no response was obtained at all.
//! - [`Error::ResponseStatus`]: a response arrived but its status was rejected.
//! - [`Error::ResponseBody`]: the status was fine but the body could not be converted.
//!
//! The last two together form the "invalid response" family, see
//! [`Error::is_invalid_response`]. Errors raised by a resilience policy itself,
//! such as [`Error::TimeoutExceeded`], are passed through as they are and carry no
//! diagnostics.

use crate::diagnostics::{CallerFrame, Diagnostics};
use crate::response::ResponseSnapshot;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// A type-erased error produced by a transport or a body converter.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for REST calls.
///
/// # Examples
///
/// ```no_run
/// use restflow::{Error, RestClient};
///
/// # async fn example() -> Result<(), Error> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.get("/endpoint")?.returning_json_value().fetch().await {
///     Ok(value) => println!("Success: {}", value),
///     Err(Error::ResponseStatus { message, response, .. }) => {
///         eprintln!("{} (status {})", message, response.status());
///     }
///     Err(Error::ResponseBody { source, .. }) => {
///         eprintln!("Body did not match: {}", source);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No response was obtained: connection refused, DNS failure, transport
    /// timeout, or an error while receiving the body.
    ///
    /// The message reads `Request to URL <uri> failed`; the transport error is
    /// available through [`std::error::Error::source`].
    #[error("{message}")]
    RequestFailure {
        /// Human-readable description.
        message: String,
        /// The request that was sent.
        request: Box<Request<Bytes>>,
        /// The underlying transport error.
        #[source]
        source: BoxError,
        /// Diagnostics captured when the request started.
        diagnostics: Arc<Diagnostics>,
    },

    /// The response status was rejected.
    ///
    /// The message reads `Got status <code> with message '<body>' for <METHOD> <uri>`.
    #[error("{message}")]
    ResponseStatus {
        /// Human-readable description.
        message: String,
        /// The request that was sent.
        request: Box<Request<Bytes>>,
        /// The rejected response.
        response: Box<ResponseSnapshot>,
        /// Diagnostics captured when the request started.
        diagnostics: Arc<Diagnostics>,
    },

    /// The response status was acceptable but the body converter failed.
    ///
    /// The converter's error is available through [`std::error::Error::source`].
    #[error("{message}")]
    ResponseBody {
        /// Human-readable description.
        message: String,
        /// The request that was sent.
        request: Box<Request<Bytes>>,
        /// The response whose body could not be converted.
        response: Box<ResponseSnapshot>,
        /// The error raised by the converter.
        #[source]
        source: BoxError,
        /// Diagnostics captured when the request started.
        diagnostics: Arc<Diagnostics>,
    },

    /// A [`TimeoutPolicy`](crate::policy::TimeoutPolicy) elapsed before the
    /// wrapped operation completed.
    #[error("Timeout of {timeout:?} exceeded")]
    TimeoutExceeded {
        /// The configured timeout.
        timeout: Duration,
    },

    /// Invalid configuration was provided, such as an invalid header or a request
    /// without a target URL.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` for [`Error::ResponseStatus`] and [`Error::ResponseBody`].
    pub fn is_invalid_response(&self) -> bool {
        matches!(
            self,
            Error::ResponseStatus { .. } | Error::ResponseBody { .. }
        )
    }

    /// Returns `true` if this error is potentially retryable.
    ///
    /// Transport failures, policy timeouts, 5xx statuses and 429 are retryable.
    /// Other statuses, body conversion failures and configuration errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RequestFailure { .. } => true,
            Error::TimeoutExceeded { .. } => true,
            Error::ResponseStatus { response, .. } => {
                let status = response.status();
                status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
            }
            Error::ResponseBody { .. } => false,
            Error::ConfigurationError(_) => false,
            Error::SerializationFailed(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns `true` if a timeout caused this error, either the policy timeout
    /// or the per-attempt transport timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::TimeoutExceeded { .. } => true,
            Error::RequestFailure { source, .. } => {
                source.is::<tokio::time::error::Elapsed>()
                    || source
                        .downcast_ref::<reqwest::Error>()
                        .is_some_and(reqwest::Error::is_timeout)
            }
            _ => false,
        }
    }

    /// Returns the diagnostics captured when the failed request started.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::RequestFailure { diagnostics, .. }
            | Error::ResponseStatus { diagnostics, .. }
            | Error::ResponseBody { diagnostics, .. } => Some(&**diagnostics),
            _ => None,
        }
    }

    /// Returns the caller frames captured when the failed request started.
    pub fn caller_frames(&self) -> &[CallerFrame] {
        self.diagnostics()
            .map(Diagnostics::caller_frames)
            .unwrap_or_default()
    }

    /// Returns the request that failed.
    pub fn request(&self) -> Option<&Request<Bytes>> {
        match self {
            Error::RequestFailure { request, .. }
            | Error::ResponseStatus { request, .. }
            | Error::ResponseBody { request, .. } => Some(&**request),
            _ => None,
        }
    }

    /// Returns the response for errors in the invalid response family.
    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            Error::ResponseStatus { response, .. } | Error::ResponseBody { response, .. } => {
                Some(&**response)
            }
            _ => None,
        }
    }

    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(ResponseSnapshot::status)
    }

    /// Returns the response headers if a response was received.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.response().map(ResponseSnapshot::headers)
    }

    /// Returns the raw response body if one was received as text.
    pub fn raw_body(&self) -> Option<&str> {
        self.response()?.body()
    }
}

/// A specialized `Result` type for REST calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn request() -> Box<Request<Bytes>> {
        let mut request = Request::new(Bytes::new());
        *request.uri_mut() = "http://localhost/foo".parse().unwrap();
        Box::new(request)
    }

    fn status_error(status: StatusCode) -> Error {
        Error::ResponseStatus {
            message: "bad".to_string(),
            request: request(),
            response: Box::new(ResponseSnapshot::new(
                status,
                HeaderMap::new(),
                Some("body".to_string()),
            )),
            diagnostics: Arc::default(),
        }
    }

    #[test]
    fn test_is_retryable() {
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!status_error(StatusCode::BAD_REQUEST).is_retryable());
        assert!(Error::TimeoutExceeded {
            timeout: Duration::from_millis(1)
        }
        .is_retryable());
        assert!(!Error::ConfigurationError("nope".to_string()).is_retryable());
    }

    #[test]
    fn test_accessors_on_status_error() {
        let error = status_error(StatusCode::IM_A_TEAPOT);
        assert!(error.is_invalid_response());
        assert_eq!(error.status(), Some(StatusCode::IM_A_TEAPOT));
        assert_eq!(error.raw_body(), Some("body"));
        assert_eq!(error.request().unwrap().uri(), "http://localhost/foo");
        assert!(error.caller_frames().is_empty());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_request_failure_keeps_source() {
        let error = Error::RequestFailure {
            message: "Request to URL http://localhost/foo failed".to_string(),
            request: request(),
            source: "connection refused".into(),
            diagnostics: Arc::default(),
        };

        assert!(!error.is_invalid_response());
        assert!(error.status().is_none());
        assert_eq!(error.source().unwrap().to_string(), "connection refused");
        assert!(!error.is_timeout());
    }
}
